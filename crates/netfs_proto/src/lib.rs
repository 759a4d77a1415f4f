//! Shared wire vocabulary for the netfs core.
//!
//! This crate carries the status codes, identifiers, and RPC trait
//! interfaces that the rest of the workspace is built against. It does
//! not implement a transport: a real deployment plugs in whatever
//! request/response mechanism it likes by implementing [`LockService`],
//! [`LockCallbackClient`], and [`ExtentService`] over the wire; tests in
//! this workspace use `netfs_harness`'s direct-dispatch implementation
//! instead.

pub mod attr;
pub mod ids;
pub mod rpc;
pub mod status;

pub use attr::{Attr, FileType};
pub use ids::{BlockId, ClientId, ExtentId, InodeNo, LockId};
pub use rpc::{AcquireOutcome, ExtentService, LockCallbackClient, LockService, ReleaseUser};
pub use status::{Result, Status};
