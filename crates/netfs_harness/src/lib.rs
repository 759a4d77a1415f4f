//! In-process RPC harness.
//!
//! Nothing here sends a byte over a socket. [`Harness`] wires one
//! shared [`netfs_extent::ExtentServer`] and one shared
//! [`netfs_lock::LockServer`] together with however many
//! [`netfs_client::FsClient`]s a test needs, registering each client's
//! lock callback endpoint the way a real deployment would register a
//! client's `host:port` after a handshake. This is enough to drive the
//! multi-client scenarios the rest of this workspace cares about
//! in-process; it is deliberately not a generic transport.

use std::sync::Arc;

use netfs_client::FsClient;
use netfs_extent::ExtentServer;
use netfs_lock::LockServer;
use netfs_proto::{ClientId, ExtentService, LockService};

pub struct Harness {
    pub extents: Arc<dyn ExtentService>,
    pub lock_server: Arc<LockServer>,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extents: Arc::new(ExtentServer::new()),
            lock_server: Arc::new(LockServer::new()),
        }
    }

    /// Builds and registers a new client.
    #[must_use]
    pub fn new_client(&self, id: impl Into<ClientId>) -> Arc<FsClient> {
        let lock_service: Arc<dyn LockService> = Arc::clone(&self.lock_server) as Arc<dyn LockService>;
        let client = FsClient::new(id.into(), Arc::clone(&self.extents), lock_service);
        self.lock_server.register_client(client.id().clone(), client.lock_callback());
        client
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
