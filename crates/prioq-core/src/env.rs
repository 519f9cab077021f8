//! Environment abstraction for deterministic testing.
//!
//! Session activity tracking and idle expiry read time through this trait
//! instead of the system clock, so tests can drive expiry with a manual clock
//! and production uses real time.

use std::time::Duration;

/// Time, randomness and sleeping as seen by the queue service.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses OS entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type used by this environment.
    ///
    /// Production uses `std::time::Instant`; tests use a virtual instant
    /// they can advance by hand.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for `duration`.
    ///
    /// Only driver code (the idle sweeper) awaits this. Session and heap
    /// logic never sleeps.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills `buffer` with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    ///
    /// Used for connection identifiers in logs.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }
}
