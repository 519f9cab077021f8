//! Request dispatcher.
//!
//! Single entry point for every client operation. The dispatcher owns the
//! session registry and decides how much of the service one request locks.
//!
//! # Locking
//!
//! - [`LockingMode::Global`]: the registry lock is held for the whole
//!   request, so every operation from every client is serialized. Any
//!   interleaving of clients is equivalent to some serial order.
//! - [`LockingMode::PerSession`]: the registry lock covers lookup, open and
//!   close only; queue operations hold just their own session's lock.
//!   Structural changes to the registry stay globally serialized.
//!
//! Lock order is always registry, then session.

use std::{sync::Mutex, time::Duration};

use bytes::Bytes;
use prioq_core::{
    CapacityPolicy, ClientId, QueueError, Request, Session,
    env::Environment,
    protocol::{ProtocolAdapter, adapter_for},
};

use crate::registry::{SessionRegistry, lock};

/// Default cap on concurrently open sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 1024;

/// How much of the service a single request locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockingMode {
    /// One lock serializes every operation of every client
    #[default]
    Global,
    /// Registry lock for open/close/lookup, one lock per session for queue
    /// operations
    PerSession,
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Whether capacity may be redeclared mid-session
    pub capacity_policy: CapacityPolicy,
    /// Lock granularity
    pub locking: LockingMode,
    /// Close sessions with no activity for this long. `None` keeps them
    /// until an explicit close.
    pub idle_timeout: Option<Duration>,
    /// Open beyond this many sessions fails with `AllocationFailure`
    pub max_sessions: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            capacity_policy: CapacityPolicy::default(),
            locking: LockingMode::default(),
            idle_timeout: None,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

/// Lock-owning front door to the session registry.
pub struct Dispatcher<E: Environment> {
    registry: Mutex<SessionRegistry<E::Instant>>,
    config: DispatcherConfig,
    env: E,
}

impl<E: Environment> Dispatcher<E> {
    /// Create a dispatcher with an empty registry.
    pub fn new(env: E, config: DispatcherConfig) -> Self {
        Self { registry: Mutex::new(SessionRegistry::new()), config, env }
    }

    /// Active configuration.
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Environment used for activity timestamps.
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Open a session for `client_id`.
    ///
    /// # Errors
    ///
    /// - `QueueError::AlreadyOpen` if the client already has a session
    /// - `QueueError::AllocationFailure` if `max_sessions` are already open
    pub fn open(&self, client_id: ClientId) -> Result<(), QueueError> {
        let mut registry = lock(&self.registry);

        if registry.contains(client_id) {
            tracing::debug!(client_id, "open rejected: already open");
            return Err(QueueError::AlreadyOpen);
        }
        if registry.len() >= self.config.max_sessions {
            tracing::warn!(client_id, max = self.config.max_sessions, "session limit reached");
            return Err(QueueError::AllocationFailure);
        }

        registry.open(client_id, self.config.capacity_policy, self.env.now())?;
        tracing::info!(client_id, sessions = registry.len(), "session opened");
        Ok(())
    }

    /// Close `client_id`'s session and free its queue.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotOpen` if the client has no session
    pub fn close(&self, client_id: ClientId) -> Result<(), QueueError> {
        let mut registry = lock(&self.registry);

        match registry.close(client_id) {
            Ok(()) => {
                tracing::info!(client_id, sessions = registry.len(), "session closed");
                Ok(())
            },
            Err(err) => {
                tracing::debug!(client_id, "close rejected: not open");
                Err(err)
            },
        }
    }

    /// Decode `request`, run it against `client_id`'s session and encode the
    /// result.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotOpen` if the client has no session
    /// - any error from decoding or from the session operation
    pub fn handle(&self, client_id: ClientId, request: &Request) -> Result<Bytes, QueueError> {
        let now = self.env.now();
        let adapter = adapter_for(request);

        match self.config.locking {
            LockingMode::Global => {
                let registry = lock(&self.registry);
                let handle = registry.find(client_id).ok_or(QueueError::NotOpen)?;
                let mut session = lock(&handle);
                execute(&mut session, adapter, request, now)
            },
            LockingMode::PerSession => {
                let handle = lock(&self.registry).find(client_id).ok_or(QueueError::NotOpen)?;
                let mut session = lock(&handle);
                execute(&mut session, adapter, request, now)
            },
        }
    }

    /// Close every session idle for at least `idle_timeout`.
    ///
    /// No-op when no idle timeout is configured. Returns the ids closed.
    pub fn expire_idle(&self) -> Vec<ClientId> {
        let Some(timeout) = self.config.idle_timeout else {
            return Vec::new();
        };

        let mut registry = lock(&self.registry);
        let expired = registry.expire_idle(self.env.now(), timeout);
        for client_id in &expired {
            tracing::info!(client_id, ?timeout, "idle session expired");
        }
        expired
    }

    /// Close every open session. Returns how many were closed.
    pub fn shutdown(&self) -> usize {
        let closed = lock(&self.registry).clear();
        tracing::info!(closed, "all sessions closed");
        closed
    }

    /// Number of open sessions.
    pub fn session_count(&self) -> usize {
        lock(&self.registry).len()
    }

    /// Whether `client_id` has an open session.
    pub fn is_open(&self, client_id: ClientId) -> bool {
        lock(&self.registry).contains(client_id)
    }
}

impl<E: Environment> std::fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("session_count", &self.session_count())
            .finish()
    }
}

/// Run one request against a locked session.
fn execute<I>(
    session: &mut Session<I>,
    adapter: &dyn ProtocolAdapter,
    request: &Request,
    now: I,
) -> Result<Bytes, QueueError>
where
    I: Copy + Ord + std::ops::Sub<Output = Duration>,
{
    let client_id = session.client_id();
    session.touch(now);

    let operation = adapter.decode(session.phase(), request).inspect_err(|err| {
        tracing::debug!(client_id, %err, "request rejected by adapter");
    })?;

    let reply = session.apply(operation).inspect_err(|err| {
        if err.is_fatal() {
            tracing::warn!(client_id, ?operation, %err, "operation failed");
        } else {
            tracing::debug!(client_id, ?operation, %err, "operation rejected");
        }
    })?;

    tracing::debug!(client_id, ?operation, ?reply, phase = ?session.phase(), "operation applied");
    if operation.is_mutating()
        && let Some(queue) = session.queue()
    {
        tracing::trace!(client_id, elements = ?queue.elements(), "queue contents");
    }

    Ok(adapter.encode(&reply))
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::Instant,
    };

    use prioq_proto::Command;

    use super::*;

    /// Manual clock: time only moves when a test advances it.
    #[derive(Clone)]
    struct TestEnv {
        base: Instant,
        offset_ms: Arc<AtomicU64>,
    }

    impl TestEnv {
        fn new() -> Self {
            Self { base: Instant::now(), offset_ms: Arc::new(AtomicU64::new(0)) }
        }

        fn advance(&self, by: Duration) {
            self.offset_ms.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        }
    }

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            use rand::RngCore;
            rand::thread_rng().fill_bytes(buffer);
        }
    }

    fn dispatcher(config: DispatcherConfig) -> Dispatcher<TestEnv> {
        Dispatcher::new(TestEnv::new(), config)
    }

    fn invoke(command: Command, arg: i32) -> Request {
        let arg = if command.arg_size() == 0 {
            Bytes::new()
        } else {
            Bytes::copy_from_slice(&arg.to_be_bytes())
        };
        Request::Invoke { code: command.to_u16(), arg }
    }

    fn write_word(word: i32) -> Request {
        Request::Write(Bytes::copy_from_slice(&word.to_be_bytes()))
    }

    fn as_i32(bytes: &Bytes) -> i32 {
        i32::from_be_bytes(bytes[..].try_into().unwrap())
    }

    #[test]
    fn open_twice_and_close_unknown() {
        let d = dispatcher(DispatcherConfig::default());

        d.open(1).unwrap();
        assert_eq!(d.open(1), Err(QueueError::AlreadyOpen));
        assert_eq!(d.close(2), Err(QueueError::NotOpen));
        assert_eq!(d.session_count(), 1);
    }

    #[test]
    fn requests_without_session_are_not_open() {
        let d = dispatcher(DispatcherConfig::default());
        assert_eq!(d.handle(9, &Request::Read { len: 4 }), Err(QueueError::NotOpen));
    }

    #[test]
    fn session_limit_reports_allocation_failure() {
        let d = dispatcher(DispatcherConfig { max_sessions: 2, ..Default::default() });

        d.open(1).unwrap();
        d.open(2).unwrap();
        assert_eq!(d.open(3), Err(QueueError::AllocationFailure));

        d.close(1).unwrap();
        d.open(3).unwrap();
    }

    #[test]
    fn streaming_session_in_both_locking_modes() {
        for locking in [LockingMode::Global, LockingMode::PerSession] {
            let d = dispatcher(DispatcherConfig { locking, ..Default::default() });
            d.open(1).unwrap();

            d.handle(1, &Request::Write(Bytes::from_static(&[5]))).unwrap();
            for (value, priority) in [(0, 5), (1, 2), (-2, 9), (3, 2), (4, 3)] {
                d.handle(1, &write_word(value)).unwrap();
                d.handle(1, &write_word(priority)).unwrap();
            }

            let drained: Vec<i32> =
                (0..5).map(|_| as_i32(&d.handle(1, &Request::Read { len: 4 }).unwrap())).collect();
            assert_eq!(drained, vec![1, 3, 4, 0, -2]);
            assert_eq!(d.handle(1, &Request::Read { len: 4 }), Err(QueueError::QueueEmpty));
        }
    }

    #[test]
    fn command_session_reports_info_and_max() {
        let d = dispatcher(DispatcherConfig::default());
        d.open(1).unwrap();

        assert_eq!(d.handle(1, &invoke(Command::GetInfo, 0)), Err(QueueError::NotInitialized));
        d.handle(1, &invoke(Command::SetCapacity, 5)).unwrap();
        for (value, priority) in [(0, 5), (1, 2), (-2, 9)] {
            d.handle(1, &invoke(Command::InsertValue, value)).unwrap();
            d.handle(1, &invoke(Command::InsertPriority, priority)).unwrap();
        }

        let info = d.handle(1, &invoke(Command::GetInfo, 0)).unwrap();
        assert_eq!(&info[..], &[0, 0, 0, 3, 0, 0, 0, 5]);

        let max = d.handle(1, &invoke(Command::GetMax, 0)).unwrap();
        assert_eq!(as_i32(&max), -2);
    }

    #[test]
    fn sessions_are_isolated() {
        let d = dispatcher(DispatcherConfig::default());
        d.open(1).unwrap();
        d.open(2).unwrap();

        d.handle(1, &invoke(Command::SetCapacity, 2)).unwrap();
        d.handle(1, &invoke(Command::InsertValue, 10)).unwrap();
        d.handle(1, &invoke(Command::InsertPriority, 1)).unwrap();

        assert_eq!(d.handle(2, &invoke(Command::GetMin, 0)), Err(QueueError::NotInitialized));
        d.handle(2, &invoke(Command::SetCapacity, 2)).unwrap();
        assert_eq!(d.handle(2, &invoke(Command::GetMin, 0)), Err(QueueError::QueueEmpty));

        assert_eq!(as_i32(&d.handle(1, &invoke(Command::GetMin, 0)).unwrap()), 10);
    }

    #[test]
    fn once_policy_is_enforced_through_dispatcher() {
        let d = dispatcher(DispatcherConfig {
            capacity_policy: CapacityPolicy::Once,
            ..Default::default()
        });
        d.open(1).unwrap();

        d.handle(1, &invoke(Command::SetCapacity, 3)).unwrap();
        assert_eq!(d.handle(1, &invoke(Command::SetCapacity, 4)), Err(QueueError::WrongPhase));
    }

    #[test]
    fn idle_sessions_expire_after_timeout() {
        let d = dispatcher(DispatcherConfig {
            idle_timeout: Some(Duration::from_secs(60)),
            ..Default::default()
        });
        d.open(1).unwrap();
        d.open(2).unwrap();

        d.env().advance(Duration::from_secs(45));
        d.handle(2, &invoke(Command::SetCapacity, 1)).unwrap();
        assert!(d.expire_idle().is_empty());

        d.env().advance(Duration::from_secs(20));
        assert_eq!(d.expire_idle(), vec![1]);
        assert!(!d.is_open(1));
        assert!(d.is_open(2));
    }

    #[test]
    fn rejected_requests_still_count_as_activity() {
        let d = dispatcher(DispatcherConfig {
            idle_timeout: Some(Duration::from_secs(10)),
            ..Default::default()
        });
        d.open(1).unwrap();

        d.env().advance(Duration::from_secs(8));
        assert_eq!(d.handle(1, &Request::Read { len: 4 }), Err(QueueError::NotInitialized));

        d.env().advance(Duration::from_secs(8));
        assert!(d.expire_idle().is_empty());
    }

    #[test]
    fn without_timeout_nothing_expires() {
        let d = dispatcher(DispatcherConfig::default());
        d.open(1).unwrap();

        d.env().advance(Duration::from_secs(86_400));
        assert!(d.expire_idle().is_empty());
        assert!(d.is_open(1));
    }

    #[test]
    fn shutdown_closes_all_sessions() {
        let d = dispatcher(DispatcherConfig::default());
        for id in 0..3 {
            d.open(id).unwrap();
        }

        assert_eq!(d.shutdown(), 3);
        assert_eq!(d.session_count(), 0);
        assert_eq!(d.close(0), Err(QueueError::NotOpen));
    }
}
