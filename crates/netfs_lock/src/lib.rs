//! Callback-based distributed lock service.
//!
//! [`LockServer`] hands out each lock to one client at a time and calls
//! back into the current holder when a contended lock is requested.
//! [`LockClientCache`] is the client half: it caches a granted lock
//! across repeated acquire/release pairs and only gives it up when the
//! server's revoke callback tells it to.

pub mod client;
pub mod server;

pub use client::LockClientCache;
pub use server::LockServer;
