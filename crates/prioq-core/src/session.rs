//! Per-client session state machine.
//!
//! A session owns at most one [`PriorityHeap`] and enforces the two-phase
//! producer protocol: a value is only ever inserted together with the
//! priority that immediately follows it.
//!
//! # State Machine
//!
//! ```text
//! ┌───────────────┐ SetCapacity ┌───────────────┐ SubmitValue ┌──────────────────┐
//! │ Uninitialized │────────────>│ AwaitingValue │────────────>│ AwaitingPriority │
//! └───────────────┘             └───────────────┘<────────────└──────────────────┘
//!                                                SubmitPriority
//! ```
//!
//! Extraction and `GetInfo` are legal in both initialized phases and never
//! change the phase. Under [`CapacityPolicy::Redeclare`], `SetCapacity` is
//! legal from every phase and returns the session to `AwaitingValue` with a
//! fresh, empty queue.
//!
//! Every transition validates before it mutates. A rejected operation leaves
//! phase, queue and pending value exactly as they were.

use std::{ops::Sub, time::Duration};

use crate::{ClientId, Operation, Reply, error::QueueError, heap::PriorityHeap};

/// Protocol phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// No capacity declared yet
    Uninitialized,
    /// Next insertion step is a value
    AwaitingValue,
    /// A value is pending; next insertion step is its priority
    AwaitingPriority,
}

/// Whether capacity may be declared more than once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapacityPolicy {
    /// Only the first declaration is accepted; later ones fail `WrongPhase`
    Once,
    /// A later declaration discards the current queue and starts a new one
    #[default]
    Redeclare,
}

/// One client's protocol state and privately owned queue.
///
/// Generic over the instant type so idle tracking can run on virtual time.
#[derive(Debug, Clone)]
pub struct Session<I> {
    client_id: ClientId,
    phase: Phase,
    queue: Option<PriorityHeap>,
    pending_value: Option<i32>,
    policy: CapacityPolicy,
    last_activity: I,
}

impl<I> Session<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Fresh `Uninitialized` session opened at `now`.
    pub fn new(client_id: ClientId, policy: CapacityPolicy, now: I) -> Self {
        Self {
            client_id,
            phase: Phase::Uninitialized,
            queue: None,
            pending_value: None,
            policy,
            last_activity: now,
        }
    }

    /// Owning client.
    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Current protocol phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The owned queue, once capacity has been declared.
    pub fn queue(&self) -> Option<&PriorityHeap> {
        self.queue.as_ref()
    }

    /// Value waiting for its priority.
    pub fn pending_value(&self) -> Option<i32> {
        self.pending_value
    }

    /// Record activity at `now`.
    ///
    /// Time never moves the marker backwards.
    pub fn touch(&mut self, now: I) {
        if now > self.last_activity {
            self.last_activity = now;
        }
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self, now: I) -> Duration {
        if now > self.last_activity { now - self.last_activity } else { Duration::ZERO }
    }

    /// Run one operation against this session.
    ///
    /// # Errors
    ///
    /// Whatever the matching transition returns; see the individual methods.
    pub fn apply(&mut self, operation: Operation) -> Result<Reply, QueueError> {
        match operation {
            Operation::SetCapacity(capacity) => self.set_capacity(capacity).map(|()| Reply::Done),
            Operation::SubmitValue(value) => self.submit_value(value).map(|()| Reply::Done),
            Operation::SubmitPriority(priority) => {
                self.submit_priority(priority).map(|()| Reply::Done)
            },
            Operation::GetInfo => {
                self.info().map(|(size, capacity)| Reply::Info { size, capacity })
            },
            Operation::ExtractMin => self.extract_min().map(Reply::Value),
            Operation::ExtractMax => self.extract_max().map(Reply::Value),
        }
    }

    /// Declare the queue capacity.
    ///
    /// The new heap is built before the old one is dropped, so an invalid
    /// redeclaration keeps the existing queue.
    ///
    /// # Errors
    ///
    /// - `QueueError::WrongPhase` under [`CapacityPolicy::Once`] once a
    ///   capacity has been declared
    /// - `QueueError::InvalidCapacity` if `capacity` is outside `1..=100`
    /// - `QueueError::AllocationFailure` if the heap cannot be allocated
    pub fn set_capacity(&mut self, capacity: i32) -> Result<(), QueueError> {
        if self.phase != Phase::Uninitialized && self.policy == CapacityPolicy::Once {
            return Err(QueueError::WrongPhase);
        }

        let heap = PriorityHeap::create(capacity)?;

        self.queue = Some(heap);
        self.pending_value = None;
        self.phase = Phase::AwaitingValue;
        Ok(())
    }

    /// Submit the value half of an element.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotInitialized` before any capacity declaration
    /// - `QueueError::WrongPhase` while a value is already pending
    pub fn submit_value(&mut self, value: i32) -> Result<(), QueueError> {
        match self.phase {
            Phase::Uninitialized => Err(QueueError::NotInitialized),
            Phase::AwaitingPriority => Err(QueueError::WrongPhase),
            Phase::AwaitingValue => {
                self.pending_value = Some(value);
                self.phase = Phase::AwaitingPriority;
                Ok(())
            },
        }
    }

    /// Submit the priority half, inserting the pending element.
    ///
    /// On failure the pending value is kept, so the client can resubmit a
    /// corrected priority.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotInitialized` before any capacity declaration
    /// - `QueueError::WrongPhase` if no value is pending
    /// - `QueueError::QueueFull` if the queue is at capacity
    /// - `QueueError::InvalidPriority` if `priority < 1`
    pub fn submit_priority(&mut self, priority: i32) -> Result<(), QueueError> {
        if self.phase == Phase::Uninitialized {
            return Err(QueueError::NotInitialized);
        }

        let (Phase::AwaitingPriority, Some(value), Some(queue)) =
            (self.phase, self.pending_value, self.queue.as_mut())
        else {
            return Err(QueueError::WrongPhase);
        };

        queue.insert(value, priority)?;

        self.pending_value = None;
        self.phase = Phase::AwaitingValue;
        Ok(())
    }

    /// Remove the minimum-priority value. Phase is unchanged.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotInitialized` before any capacity declaration
    /// - `QueueError::QueueEmpty` if the queue has no elements
    pub fn extract_min(&mut self) -> Result<i32, QueueError> {
        self.queue_mut()?.extract_min()
    }

    /// Remove the maximum-priority value. Phase is unchanged.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotInitialized` before any capacity declaration
    /// - `QueueError::QueueEmpty` if the queue has no elements
    pub fn extract_max(&mut self) -> Result<i32, QueueError> {
        self.queue_mut()?.extract_max()
    }

    /// Current `(size, capacity)`.
    ///
    /// # Errors
    ///
    /// - `QueueError::NotInitialized` before any capacity declaration
    pub fn info(&self) -> Result<(i32, i32), QueueError> {
        let queue = self.queue.as_ref().ok_or(QueueError::NotInitialized)?;

        // Both are bounded by MAX_CAPACITY.
        let size = i32::try_from(queue.len()).map_err(|_| QueueError::InvalidArgument)?;
        let capacity = i32::try_from(queue.capacity()).map_err(|_| QueueError::InvalidArgument)?;
        Ok((size, capacity))
    }

    fn queue_mut(&mut self) -> Result<&mut PriorityHeap, QueueError> {
        self.queue.as_mut().ok_or(QueueError::NotInitialized)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn session(policy: CapacityPolicy) -> Session<Instant> {
        Session::new(1, policy, Instant::now())
    }

    fn insert(session: &mut Session<Instant>, value: i32, priority: i32) {
        session.submit_value(value).unwrap();
        session.submit_priority(priority).unwrap();
    }

    #[test]
    fn everything_before_capacity_is_not_initialized() {
        let mut s = session(CapacityPolicy::Redeclare);

        assert_eq!(s.submit_value(1), Err(QueueError::NotInitialized));
        assert_eq!(s.submit_priority(1), Err(QueueError::NotInitialized));
        assert_eq!(s.extract_min(), Err(QueueError::NotInitialized));
        assert_eq!(s.extract_max(), Err(QueueError::NotInitialized));
        assert_eq!(s.info(), Err(QueueError::NotInitialized));
        assert_eq!(s.phase(), Phase::Uninitialized);
    }

    #[test]
    fn priority_without_value_is_wrong_phase() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(3).unwrap();

        assert_eq!(s.submit_priority(4), Err(QueueError::WrongPhase));
        assert_eq!(s.phase(), Phase::AwaitingValue);
    }

    #[test]
    fn value_twice_is_wrong_phase() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(3).unwrap();
        s.submit_value(10).unwrap();

        assert_eq!(s.submit_value(11), Err(QueueError::WrongPhase));
        assert_eq!(s.pending_value(), Some(10));
        assert_eq!(s.phase(), Phase::AwaitingPriority);
    }

    #[test]
    fn phases_cycle_value_then_priority() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(2).unwrap();
        assert_eq!(s.phase(), Phase::AwaitingValue);

        s.submit_value(7).unwrap();
        assert_eq!(s.phase(), Phase::AwaitingPriority);

        s.submit_priority(3).unwrap();
        assert_eq!(s.phase(), Phase::AwaitingValue);
        assert_eq!(s.pending_value(), None);
        assert_eq!(s.info(), Ok((1, 2)));
    }

    #[test]
    fn rejected_priority_keeps_pending_value() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(2).unwrap();
        s.submit_value(7).unwrap();

        assert_eq!(s.submit_priority(0), Err(QueueError::InvalidPriority(0)));
        assert_eq!(s.phase(), Phase::AwaitingPriority);
        assert_eq!(s.pending_value(), Some(7));

        s.submit_priority(1).unwrap();
        assert_eq!(s.extract_min(), Ok(7));
    }

    #[test]
    fn extraction_keeps_phase() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(3).unwrap();
        insert(&mut s, 5, 1);
        s.submit_value(6).unwrap();

        assert_eq!(s.extract_min(), Ok(5));
        assert_eq!(s.phase(), Phase::AwaitingPriority);
        assert_eq!(s.extract_max(), Err(QueueError::QueueEmpty));
        assert_eq!(s.pending_value(), Some(6));
    }

    #[test]
    fn scenario_min_extraction_order() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(5).unwrap();
        for (value, priority) in [(0, 5), (1, 2), (-2, 9), (3, 2), (4, 3)] {
            insert(&mut s, value, priority);
        }

        let drained: Vec<i32> = (0..5).map(|_| s.extract_min().unwrap()).collect();
        assert_eq!(drained, vec![1, 3, 4, 0, -2]);
    }

    #[test]
    fn scenario_single_max_extraction() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(5).unwrap();
        for (value, priority) in [(0, 5), (1, 2), (-2, 9), (3, 2), (4, 3)] {
            insert(&mut s, value, priority);
        }

        assert_eq!(s.extract_max(), Ok(-2));
        assert_eq!(s.info(), Ok((4, 5)));
    }

    #[test]
    fn scenario_full_then_empty() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(2).unwrap();
        insert(&mut s, 1, 1);
        insert(&mut s, 2, 2);

        s.submit_value(3).unwrap();
        assert_eq!(s.submit_priority(3), Err(QueueError::QueueFull));

        assert_eq!(s.extract_min(), Ok(1));
        assert_eq!(s.extract_min(), Ok(2));
        assert_eq!(s.extract_min(), Err(QueueError::QueueEmpty));
    }

    #[test]
    fn redeclare_discards_queue_and_pending_value() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(3).unwrap();
        insert(&mut s, 1, 1);
        s.submit_value(2).unwrap();

        s.set_capacity(10).unwrap();
        assert_eq!(s.phase(), Phase::AwaitingValue);
        assert_eq!(s.pending_value(), None);
        assert_eq!(s.info(), Ok((0, 10)));
    }

    #[test]
    fn invalid_redeclare_keeps_existing_queue() {
        let mut s = session(CapacityPolicy::Redeclare);
        s.set_capacity(3).unwrap();
        insert(&mut s, 1, 1);

        assert_eq!(s.set_capacity(0), Err(QueueError::InvalidCapacity(0)));
        assert_eq!(s.info(), Ok((1, 3)));
        assert_eq!(s.phase(), Phase::AwaitingValue);
    }

    #[test]
    fn once_policy_rejects_second_declaration() {
        let mut s = session(CapacityPolicy::Once);
        assert_eq!(s.set_capacity(101), Err(QueueError::InvalidCapacity(101)));
        s.set_capacity(4).unwrap();

        assert_eq!(s.set_capacity(8), Err(QueueError::WrongPhase));
        assert_eq!(s.info(), Ok((0, 4)));
    }

    #[test]
    fn apply_maps_operations_to_replies() {
        let mut s = session(CapacityPolicy::Redeclare);
        assert_eq!(s.apply(Operation::SetCapacity(2)), Ok(Reply::Done));
        assert_eq!(s.apply(Operation::SubmitValue(9)), Ok(Reply::Done));
        assert_eq!(s.apply(Operation::SubmitPriority(4)), Ok(Reply::Done));
        assert_eq!(s.apply(Operation::GetInfo), Ok(Reply::Info { size: 1, capacity: 2 }));
        assert_eq!(s.apply(Operation::ExtractMax), Ok(Reply::Value(9)));
        assert_eq!(s.apply(Operation::ExtractMin), Err(QueueError::QueueEmpty));
    }

    #[test]
    fn idle_time_tracks_last_touch() {
        let start = Instant::now();
        let mut s = Session::new(9, CapacityPolicy::Once, start);

        let later = start + Duration::from_secs(5);
        assert_eq!(s.idle_for(later), Duration::from_secs(5));

        s.touch(later);
        assert_eq!(s.idle_for(later), Duration::ZERO);

        // An older instant neither rewinds the marker nor underflows.
        s.touch(start);
        assert_eq!(s.idle_for(start), Duration::ZERO);
        assert_eq!(s.idle_for(later + Duration::from_secs(1)), Duration::from_secs(1));
    }
}
