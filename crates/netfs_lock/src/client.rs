use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use log::trace;
use netfs_proto::{AcquireOutcome, ClientId, LockCallbackClient, LockId, LockService, ReleaseUser, Status};

/// How long a client sits on a revoke before actually giving the lock
/// up. The original protocol slept briefly here to give a client doing
/// a burst of lock/unlock pairs a chance to finish its current one
/// before being forced to hand the lock away.
const REVOKE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClientLockState {
    None,
    Free,
    Locked,
    Acquiring,
    Releasing,
}

impl Default for ClientLockState {
    fn default() -> Self {
        Self::None
    }
}

#[derive(Default)]
struct LockInfo {
    state: ClientLockState,
    revoked: bool,
}

struct Table {
    locks: HashMap<LockId, LockInfo>,
}

/// A caching lock client: holds granted locks until another client
/// needs them (the server's revoke callback), rather than releasing
/// after every use.
///
/// `release_user`, if set, is asked to flush any cache state tied to a
/// lock id immediately before that lock is actually surrendered to the
/// server on a revoked release.
pub struct LockClientCache {
    id: ClientId,
    server: Arc<dyn LockService>,
    release_user: Option<Arc<dyn ReleaseUser>>,
    table: Mutex<Table>,
    cond: Condvar,
}

impl LockClientCache {
    #[must_use]
    pub fn new(id: ClientId, server: Arc<dyn LockService>, release_user: Option<Arc<dyn ReleaseUser>>) -> Self {
        Self {
            id,
            server,
            release_user,
            table: Mutex::new(Table { locks: HashMap::new() }),
            cond: Condvar::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Blocks until `lid` is held locally, acquiring it from the server
    /// if it is not already cached.
    ///
    /// # Errors
    ///
    /// Returns the server's [`Status`] if the RPC to acquire fails.
    pub fn acquire(&self, lid: LockId) -> Result<(), Status> {
        let mut table = self.table.lock().unwrap();
        while !matches!(
            table.locks.get(&lid).map(|i| i.state),
            None | Some(ClientLockState::Free)
        ) {
            table = self.cond.wait(table).unwrap();
        }

        if table.locks.get(&lid).map(|i| i.state) == Some(ClientLockState::Free) {
            table.locks.get_mut(&lid).unwrap().state = ClientLockState::Locked;
            trace!("lock {lid}: served from local cache");
            return Ok(());
        }

        table.locks.entry(lid).or_default().state = ClientLockState::Acquiring;
        drop(table);

        let outcome = self.server.acquire(lid, self.id.clone())?;

        let mut table = self.table.lock().unwrap();
        while outcome == AcquireOutcome::Retry
            && table.locks.get(&lid).map(|i| i.state) == Some(ClientLockState::Acquiring)
        {
            table = self.cond.wait(table).unwrap();
        }
        table.locks.entry(lid).or_default().state = ClientLockState::Locked;
        trace!("lock {lid}: acquired from server");
        Ok(())
    }

    /// Surrenders local use of `lid`. If the lock was revoked while
    /// held, this actually releases it to the server (flushing via
    /// `release_user` first); otherwise the lock stays cached locally.
    ///
    /// # Errors
    ///
    /// Returns the server's [`Status`] if a revoked release's RPC fails.
    pub fn release(&self, lid: LockId) -> Result<(), Status> {
        let mut table = self.table.lock().unwrap();
        let revoked = table.locks.get(&lid).is_some_and(|i| i.revoked);

        if revoked {
            table.locks.entry(lid).or_default().state = ClientLockState::Releasing;
            drop(table);

            if let Some(user) = &self.release_user {
                user.dorelease(lid);
            }
            self.server.release(lid, self.id.clone())?;

            let mut table = self.table.lock().unwrap();
            let info = table.locks.entry(lid).or_default();
            info.state = ClientLockState::None;
            info.revoked = false;
        } else {
            table.locks.entry(lid).or_default().state = ClientLockState::Free;
        }

        self.cond.notify_all();
        Ok(())
    }
}

impl LockCallbackClient for LockClientCache {
    fn revoke(&self, lid: LockId) -> Result<(), Status> {
        std::thread::sleep(REVOKE_DELAY);
        let mut table = self.table.lock().unwrap();
        table.locks.entry(lid).or_default().revoked = true;
        let is_free = table.locks.get(&lid).map(|i| i.state) == Some(ClientLockState::Free);
        drop(table);

        if is_free {
            self.release(lid)?;
        }
        Ok(())
    }

    fn retry(&self, lid: LockId) -> Result<(), Status> {
        let mut table = self.table.lock().unwrap();
        table.locks.entry(lid).or_default().state = ClientLockState::Locked;
        self.cond.notify_all();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::LockServer;

    #[test]
    fn acquire_then_release_leaves_lock_cached_as_free() {
        let server: Arc<dyn LockService> = Arc::new(LockServer::new());
        let client = LockClientCache::new(ClientId::from("a"), server, None);
        client.acquire(LockId::new(7)).unwrap();
        client.release(LockId::new(7)).unwrap();

        let table = client.table.lock().unwrap();
        assert_eq!(table.locks.get(&LockId::new(7)).unwrap().state, ClientLockState::Free);
    }

    #[test]
    fn second_acquire_is_served_from_cache_without_contacting_server() {
        let server: Arc<dyn LockService> = Arc::new(LockServer::new());
        let client = LockClientCache::new(ClientId::from("a"), server, None);
        client.acquire(LockId::new(1)).unwrap();
        client.release(LockId::new(1)).unwrap();
        client.acquire(LockId::new(1)).unwrap();

        let table = client.table.lock().unwrap();
        assert_eq!(table.locks.get(&LockId::new(1)).unwrap().state, ClientLockState::Locked);
    }

    #[test]
    fn revoke_while_free_triggers_immediate_release() {
        let server: Arc<dyn LockService> = Arc::new(LockServer::new());
        let client = LockClientCache::new(ClientId::from("a"), Arc::clone(&server), None);
        client.acquire(LockId::new(1)).unwrap();
        client.release(LockId::new(1)).unwrap();

        client.revoke(LockId::new(1)).unwrap();

        let table = client.table.lock().unwrap();
        assert_eq!(table.locks.get(&LockId::new(1)).unwrap().state, ClientLockState::None);
    }
}
