//! Lock-guarded filesystem client.
//!
//! [`FsClient`] is the user-facing surface: every operation acquires
//! the target inode's lock, works against a local cache of that
//! inode's attributes and content, and releases the lock when done.
//! The lock is only actually surrendered to the server (flushing
//! dirty cache state first) once a revoke callback arrives; see
//! `netfs_lock` for that half of the protocol.

pub mod cache;
pub mod client;
pub mod dirent;

pub use client::{DirInfo, FileInfo, FsClient, ROOT};
pub use dirent::DirEntry;
