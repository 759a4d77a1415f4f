//! RPC trait interfaces.
//!
//! These traits are the "request/response RPC abstraction" the core is
//! built against. Nothing in this crate (or in `netfs_lock`,
//! `netfs_extent`, `netfs_client`) sends a byte over a socket; a real
//! deployment implements these traits over its transport of choice.
//! `netfs_harness` provides a direct-dispatch, same-process
//! implementation used by this workspace's own tests.

use crate::{Attr, ClientId, ExtentId, FileType, LockId, Status};

/// Outcome of a lock `acquire` call that did not fail at the transport
/// layer. `Retry` means the server enqueued the caller and will deliver
/// a `retry` callback once the lock is handed off; it is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    Granted,
    Retry,
}

/// The lock server's client-facing RPC surface.
pub trait LockService: Send + Sync {
    fn acquire(&self, lid: LockId, client: ClientId) -> Result<AcquireOutcome, Status>;
    fn release(&self, lid: LockId, client: ClientId) -> Result<(), Status>;
    fn stat(&self, lid: LockId) -> Result<u32, Status>;
}

/// The lock server's server-to-client callback surface. Every live lock
/// client implements this and registers itself so the server can reach
/// it by [`ClientId`].
pub trait LockCallbackClient: Send + Sync {
    fn revoke(&self, lid: LockId) -> Result<(), Status>;
    fn retry(&self, lid: LockId) -> Result<(), Status>;
}

/// The extent server's client-facing RPC surface.
pub trait ExtentService: Send + Sync {
    fn create(&self, ty: FileType) -> Result<ExtentId, Status>;
    fn get(&self, eid: ExtentId) -> Result<Vec<u8>, Status>;
    fn getattr(&self, eid: ExtentId) -> Result<Attr, Status>;
    fn put(&self, eid: ExtentId, bytes: Vec<u8>) -> Result<(), Status>;
    fn remove(&self, eid: ExtentId) -> Result<(), Status>;
}

/// Hook invoked by a lock client immediately before it surrenders a
/// revoked lock, giving the owner of the lock (the filesystem client)
/// a chance to flush dirty cache state tied to that lock id.
pub trait ReleaseUser: Send + Sync {
    fn dorelease(&self, lid: LockId);
}
