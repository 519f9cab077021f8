//! Session registry.
//!
//! Maps each open client to its session. Entries are created by `open` and
//! destroyed by `close` (or idle expiry); lookups never create one.
//!
//! Each session sits behind its own mutex so the dispatcher can release the
//! registry before running a queue operation when per-session locking is
//! enabled. Under global locking the session mutex is always taken while the
//! registry guard is held and is never contended.

use std::{
    collections::HashMap,
    ops::Sub,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use prioq_core::{CapacityPolicy, ClientId, QueueError, Session};

/// Shared handle to one client's session.
pub type SessionHandle<I> = Arc<Mutex<Session<I>>>;

/// Lock a mutex, recovering the guard if a previous holder panicked.
///
/// Every session operation validates before it mutates, so a panic can
/// never leave a half-applied update behind.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of open sessions, keyed by client id.
#[derive(Debug)]
pub struct SessionRegistry<I> {
    sessions: HashMap<ClientId, SessionHandle<I>>,
}

impl<I> Default for SessionRegistry<I> {
    fn default() -> Self {
        Self { sessions: HashMap::new() }
    }
}

impl<I> SessionRegistry<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a fresh `Uninitialized` session for `client_id`.
    ///
    /// # Errors
    ///
    /// - `QueueError::AlreadyOpen` if the client already has a session
    pub fn open(
        &mut self,
        client_id: ClientId,
        policy: CapacityPolicy,
        now: I,
    ) -> Result<SessionHandle<I>, QueueError> {
        if self.sessions.contains_key(&client_id) {
            return Err(QueueError::AlreadyOpen);
        }

        let handle = Arc::new(Mutex::new(Session::new(client_id, policy, now)));
        self.sessions.insert(client_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Close `client_id`'s session, dropping its queue.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotOpen` if the client has no session
    pub fn close(&mut self, client_id: ClientId) -> Result<(), QueueError> {
        self.sessions.remove(&client_id).map(drop).ok_or(QueueError::NotOpen)
    }

    /// Session for `client_id`. `None` if the client has no session.
    pub fn find(&self, client_id: ClientId) -> Option<SessionHandle<I>> {
        self.sessions.get(&client_id).cloned()
    }

    /// Whether `client_id` has a session.
    pub fn contains(&self, client_id: ClientId) -> bool {
        self.sessions.contains_key(&client_id)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are open.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Close every session idle for at least `timeout` as of `now`.
    ///
    /// Returns the ids that were closed.
    pub fn expire_idle(&mut self, now: I, timeout: Duration) -> Vec<ClientId> {
        let expired: Vec<ClientId> = self
            .sessions
            .iter()
            .filter(|(_, handle)| lock(handle).idle_for(now) >= timeout)
            .map(|(client_id, _)| *client_id)
            .collect();

        for client_id in &expired {
            self.sessions.remove(client_id);
        }
        expired
    }

    /// Close every session. Returns how many were open.
    pub fn clear(&mut self) -> usize {
        let count = self.sessions.len();
        self.sessions.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn open_twice_is_already_open() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        registry.open(1, CapacityPolicy::Redeclare, now).unwrap();
        let second = registry.open(1, CapacityPolicy::Redeclare, now);

        assert_eq!(second.err(), Some(QueueError::AlreadyOpen));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn close_unknown_is_not_open() {
        let mut registry: SessionRegistry<Instant> = SessionRegistry::new();
        assert_eq!(registry.close(42), Err(QueueError::NotOpen));
    }

    #[test]
    fn close_removes_entry_and_allows_reopen() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();

        let handle = registry.open(7, CapacityPolicy::Redeclare, now).unwrap();
        lock(&handle).set_capacity(3).unwrap();

        registry.close(7).unwrap();
        assert!(registry.find(7).is_none());
        assert_eq!(registry.close(7), Err(QueueError::NotOpen));

        // A reopened client starts from scratch.
        let handle = registry.open(7, CapacityPolicy::Redeclare, now).unwrap();
        assert_eq!(lock(&handle).info(), Err(QueueError::NotInitialized));
    }

    #[test]
    fn find_never_creates() {
        let registry: SessionRegistry<Instant> = SessionRegistry::new();
        assert!(registry.find(3).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn find_shares_the_same_session() {
        let mut registry = SessionRegistry::new();
        registry.open(5, CapacityPolicy::Redeclare, Instant::now()).unwrap();

        let a = registry.find(5).unwrap();
        let b = registry.find(5).unwrap();
        lock(&a).set_capacity(4).unwrap();
        assert_eq!(lock(&b).info(), Ok((0, 4)));
    }

    #[test]
    fn expire_idle_closes_only_stale_sessions() {
        let mut registry = SessionRegistry::new();
        let start = Instant::now();

        registry.open(1, CapacityPolicy::Redeclare, start).unwrap();
        let active = registry.open(2, CapacityPolicy::Redeclare, start).unwrap();

        let later = start + Duration::from_secs(30);
        lock(&active).touch(later);

        let expired = registry.expire_idle(later, Duration::from_secs(10));
        assert_eq!(expired, vec![1]);
        assert!(registry.contains(2));
        assert!(!registry.contains(1));
    }

    #[test]
    fn clear_closes_everything() {
        let mut registry = SessionRegistry::new();
        let now = Instant::now();
        for id in 0..4 {
            registry.open(id, CapacityPolicy::Once, now).unwrap();
        }

        assert_eq!(registry.len(), 4);

        assert_eq!(registry.clear(), 4);
        assert!(registry.is_empty());
        assert!((0..4).all(|id| registry.find(id).is_none()));
    }
}
