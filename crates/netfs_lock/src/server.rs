use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use log::trace;
use netfs_proto::{AcquireOutcome, ClientId, LockCallbackClient, LockId, LockService, Status};

#[derive(Default)]
struct LockInfo {
    locked: bool,
    holder: Option<ClientId>,
    waiting: VecDeque<ClientId>,
}

struct State {
    locks: HashMap<LockId, LockInfo>,
    nacquire: u32,
}

/// The lock server. Grants each lock to one client at a time and, when a
/// contended lock is requested, calls back into the current holder (or
/// the last enqueued waiter) asking it to revoke.
///
/// Callback clients must be registered with [`LockServer::register_client`]
/// before any lock they hold can be contended; a client reachable only by
/// a transport address (as the original RPC-level protocol assumed)
/// would be registered the same way once that transport is wired in.
pub struct LockServer {
    state: Mutex<State>,
    clients: Mutex<HashMap<ClientId, Arc<dyn LockCallbackClient>>>,
}

impl LockServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                locks: HashMap::new(),
                nacquire: 0,
            }),
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_client(&self, id: ClientId, callback: Arc<dyn LockCallbackClient>) {
        self.clients.lock().unwrap().insert(id, callback);
    }

    pub fn unregister_client(&self, id: &ClientId) {
        self.clients.lock().unwrap().remove(id);
    }

    fn callback_for(&self, id: &ClientId) -> Result<Arc<dyn LockCallbackClient>, Status> {
        self.clients.lock().unwrap().get(id).cloned().ok_or(Status::RpcErr)
    }
}

impl Default for LockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl LockService for LockServer {
    fn acquire(&self, lid: LockId, client: ClientId) -> Result<AcquireOutcome, Status> {
        let mut state = self.state.lock().unwrap();
        let info = state.locks.entry(lid).or_default();

        if info.locked {
            let revoke_target = info
                .waiting
                .back()
                .cloned()
                .or_else(|| info.holder.clone())
                .expect("a locked entry always has a holder or a waiter");
            info.waiting.push_back(client);
            drop(state);

            trace!("lock {lid}: contended, asking {revoke_target} to revoke");
            self.callback_for(&revoke_target)?.revoke(lid)?;
            return Ok(AcquireOutcome::Retry);
        }

        info.locked = true;
        info.holder = Some(client);
        state.nacquire += 1;
        trace!("lock {lid}: granted");
        Ok(AcquireOutcome::Granted)
    }

    fn release(&self, lid: LockId, _client: ClientId) -> Result<(), Status> {
        let mut state = self.state.lock().unwrap();
        let info = state.locks.get_mut(&lid).ok_or(Status::Io)?;

        if let Some(next) = info.waiting.pop_front() {
            info.holder = Some(next.clone());
            drop(state);
            trace!("lock {lid}: handing off to {next}");
            self.callback_for(&next)?.retry(lid)?;
            return Ok(());
        }

        if info.locked {
            state.nacquire -= 1;
        }
        info.locked = false;
        info.holder = None;
        trace!("lock {lid}: released, no waiters");
        Ok(())
    }

    fn stat(&self, _lid: LockId) -> Result<u32, Status> {
        Ok(self.state.lock().unwrap().nacquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullCallback;
    impl LockCallbackClient for NullCallback {
        fn revoke(&self, _lid: LockId) -> Result<(), Status> {
            Ok(())
        }

        fn retry(&self, _lid: LockId) -> Result<(), Status> {
            Ok(())
        }
    }

    #[test]
    fn uncontended_acquire_is_granted_immediately() {
        let server = LockServer::new();
        let lid = LockId::new(1);
        let a = ClientId::from("a");
        assert_eq!(server.acquire(lid, a).unwrap(), AcquireOutcome::Granted);
        assert_eq!(server.stat(lid).unwrap(), 1);
    }

    #[test]
    fn contended_acquire_enqueues_and_asks_holder_to_revoke() {
        let server = LockServer::new();
        let lid = LockId::new(1);
        let a = ClientId::from("a");
        let b = ClientId::from("b");
        server.register_client(a.clone(), Arc::new(NullCallback));
        server.acquire(lid, a).unwrap();
        assert_eq!(server.acquire(lid, b).unwrap(), AcquireOutcome::Retry);
    }

    #[test]
    fn contending_without_a_registered_holder_is_an_rpc_error() {
        let server = LockServer::new();
        let lid = LockId::new(1);
        let a = ClientId::from("a");
        let b = ClientId::from("b");
        server.acquire(lid, a).unwrap();
        assert_eq!(server.acquire(lid, b), Err(Status::RpcErr));
    }

    #[test]
    fn release_with_no_waiters_clears_the_lock_and_stat_count() {
        let server = LockServer::new();
        let lid = LockId::new(1);
        let a = ClientId::from("a");
        server.acquire(lid, a.clone()).unwrap();
        server.release(lid, a).unwrap();
        assert_eq!(server.stat(lid).unwrap(), 0);
    }

    #[test]
    fn release_with_a_waiter_hands_off_without_changing_stat_count() {
        let server = LockServer::new();
        let lid = LockId::new(1);
        let a = ClientId::from("a");
        let b = ClientId::from("b");
        server.register_client(a.clone(), Arc::new(NullCallback));
        server.register_client(b.clone(), Arc::new(NullCallback));
        server.acquire(lid, a.clone()).unwrap();
        server.acquire(lid, b).unwrap();
        server.release(lid, a).unwrap();
        assert_eq!(server.stat(lid).unwrap(), 1);
    }
}
