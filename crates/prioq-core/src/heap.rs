//! Bounded binary min-heap with minimum and maximum extraction.
//!
//! Elements are ordered by `(priority, sequence)`: lower priority first, and
//! among equal priorities the earlier insertion first. Only the min-heap
//! invariant is physically maintained. Maximum extraction scans for the
//! largest element, forces it to the root with a sentinel priority and then
//! removes the root like a normal minimum extraction.
//!
//! # Tie-breaks
//!
//! Both extractions compare with the same `(priority, sequence)` key, which
//! produces an asymmetry worth knowing about:
//!
//! - `extract_min` returns equal-priority elements oldest first (FIFO)
//! - `extract_max` returns equal-priority elements newest first (LIFO)
//!
//! # Invariants
//!
//! - `len() <= capacity()` at all times; the buffer never grows
//! - for every non-root index `i`, `elements[i]` is not smaller than
//!   `elements[parent(i)]`
//! - sequences are assigned from a per-heap counter and never reused

use crate::error::QueueError;

/// Smallest capacity a heap may be created with.
pub const MIN_CAPACITY: i32 = 1;

/// Largest capacity a heap may be created with.
pub const MAX_CAPACITY: i32 = 100;

/// Smallest priority accepted by [`PriorityHeap::insert`].
pub const MIN_PRIORITY: i32 = 1;

/// Priority written over an element to force it to the root during
/// maximum extraction. Strictly below every legal priority.
pub const SENTINEL_PRIORITY: i32 = MIN_PRIORITY - 1;

/// One queued element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    /// Caller-supplied payload
    pub value: i32,
    /// Caller-supplied priority (>= 1 once inserted)
    pub priority: i32,
    /// Insertion order within the owning heap
    pub sequence: u64,
}

impl Element {
    /// Ordering key: priority first, insertion order second.
    #[must_use]
    pub fn key(&self) -> (i32, u64) {
        (self.priority, self.sequence)
    }

    /// Whether `self` sorts strictly before `other`.
    #[must_use]
    pub fn is_smaller(&self, other: &Self) -> bool {
        self.key() < other.key()
    }
}

/// Array-backed binary min-heap with a fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityHeap {
    elements: Vec<Element>,
    capacity: usize,
    next_sequence: u64,
}

impl PriorityHeap {
    /// Create an empty heap holding at most `capacity` elements.
    ///
    /// The whole buffer is reserved up front so inserts never allocate.
    ///
    /// # Errors
    ///
    /// - `QueueError::InvalidCapacity` if `capacity` is outside `1..=100`
    /// - `QueueError::AllocationFailure` if the buffer cannot be reserved
    pub fn create(capacity: i32) -> Result<Self, QueueError> {
        if !(MIN_CAPACITY..=MAX_CAPACITY).contains(&capacity) {
            return Err(QueueError::InvalidCapacity(capacity));
        }

        let capacity = capacity as usize;
        let mut elements = Vec::new();
        elements.try_reserve_exact(capacity).map_err(|_| QueueError::AllocationFailure)?;

        Ok(Self { elements, capacity, next_sequence: 0 })
    }

    /// Number of queued elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the heap holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Whether the heap is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.elements.len() == self.capacity
    }

    /// Maximum number of elements.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Elements in heap (array) order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Insert `value` with `priority`, returning the assigned sequence.
    ///
    /// # Errors
    ///
    /// - `QueueError::QueueFull` if the heap is at capacity
    /// - `QueueError::InvalidPriority` if `priority < 1`
    pub fn insert(&mut self, value: i32, priority: i32) -> Result<u64, QueueError> {
        if self.is_full() {
            return Err(QueueError::QueueFull);
        }
        if priority < MIN_PRIORITY {
            return Err(QueueError::InvalidPriority(priority));
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.elements.push(Element { value, priority, sequence });
        self.sift_up(self.elements.len() - 1);

        debug_assert!(self.elements.len() <= self.capacity);
        Ok(sequence)
    }

    /// Remove and return the value of the smallest element.
    ///
    /// # Errors
    ///
    /// - `QueueError::QueueEmpty` if the heap has no elements
    pub fn extract_min(&mut self) -> Result<i32, QueueError> {
        if self.elements.is_empty() {
            return Err(QueueError::QueueEmpty);
        }
        Ok(self.remove_root().value)
    }

    /// Remove and return the value of the largest element.
    ///
    /// Among equal priorities the most recently inserted element is the
    /// largest. O(n): the heap has no max-ordering, so the maximum is found
    /// by a linear scan.
    ///
    /// # Errors
    ///
    /// - `QueueError::QueueEmpty` if the heap has no elements
    pub fn extract_max(&mut self) -> Result<i32, QueueError> {
        if self.elements.is_empty() {
            return Err(QueueError::QueueEmpty);
        }

        let mut max_index = 0;
        for i in 1..self.elements.len() {
            if self.elements[max_index].is_smaller(&self.elements[i]) {
                max_index = i;
            }
        }

        let value = self.elements[max_index].value;

        self.elements[max_index].priority = SENTINEL_PRIORITY;
        self.sift_up(max_index);
        debug_assert_eq!(self.elements[0].priority, SENTINEL_PRIORITY);

        self.remove_root();
        Ok(value)
    }

    /// Check the heap invariant over every parent/child pair.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (1..self.elements.len())
            .all(|i| !self.elements[i].is_smaller(&self.elements[parent(i)]))
    }

    /// Move the last element into the root slot and restore the invariant.
    ///
    /// Caller guarantees the heap is non-empty.
    fn remove_root(&mut self) -> Element {
        let root = self.elements.swap_remove(0);
        if !self.elements.is_empty() {
            self.sift_down(0);
        }
        debug_assert!(self.is_valid());
        root
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let p = parent(i);
            if !self.elements[i].is_smaller(&self.elements[p]) {
                break;
            }
            self.elements.swap(i, p);
            i = p;
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        let len = self.elements.len();
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            if left >= len {
                break;
            }

            let mut smallest = left;
            if right < len && self.elements[right].is_smaller(&self.elements[left]) {
                smallest = right;
            }

            if !self.elements[smallest].is_smaller(&self.elements[i]) {
                break;
            }
            self.elements.swap(i, smallest);
            i = smallest;
        }
    }
}

fn parent(i: usize) -> usize {
    (i - 1) / 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_heap() -> PriorityHeap {
        let mut heap = PriorityHeap::create(5).unwrap();
        for (value, priority) in [(0, 5), (1, 2), (-2, 9), (3, 2), (4, 3)] {
            heap.insert(value, priority).unwrap();
        }
        heap
    }

    #[test]
    fn create_rejects_out_of_range_capacity() {
        assert_eq!(PriorityHeap::create(0).unwrap_err(), QueueError::InvalidCapacity(0));
        assert_eq!(PriorityHeap::create(101).unwrap_err(), QueueError::InvalidCapacity(101));
        assert_eq!(PriorityHeap::create(-5).unwrap_err(), QueueError::InvalidCapacity(-5));

        assert_eq!(PriorityHeap::create(1).unwrap().capacity(), 1);
        assert_eq!(PriorityHeap::create(100).unwrap().capacity(), 100);
    }

    #[test]
    fn extract_min_follows_priority_then_insertion() {
        let mut heap = scenario_heap();

        let drained: Vec<i32> = (0..5).map(|_| heap.extract_min().unwrap()).collect();
        assert_eq!(drained, vec![1, 3, 4, 0, -2]);
        assert_eq!(heap.extract_min(), Err(QueueError::QueueEmpty));
    }

    #[test]
    fn extract_max_takes_unique_highest_priority() {
        let mut heap = scenario_heap();

        assert_eq!(heap.extract_max(), Ok(-2));
        assert_eq!(heap.len(), 4);
        assert!(heap.is_valid());
    }

    #[test]
    fn extract_max_prefers_latest_among_equal_priorities() {
        let mut heap = PriorityHeap::create(4).unwrap();
        for value in [10, 20, 30] {
            heap.insert(value, 7).unwrap();
        }

        assert_eq!(heap.extract_max(), Ok(30));
        assert_eq!(heap.extract_max(), Ok(20));
        assert_eq!(heap.extract_max(), Ok(10));
    }

    #[test]
    fn extract_min_prefers_earliest_among_equal_priorities() {
        let mut heap = PriorityHeap::create(4).unwrap();
        for value in [10, 20, 30] {
            heap.insert(value, 7).unwrap();
        }

        assert_eq!(heap.extract_min(), Ok(10));
        assert_eq!(heap.extract_min(), Ok(20));
        assert_eq!(heap.extract_min(), Ok(30));
    }

    #[test]
    fn capacity_is_a_hard_bound() {
        let mut heap = PriorityHeap::create(2).unwrap();
        heap.insert(1, 1).unwrap();
        heap.insert(2, 1).unwrap();

        assert!(heap.is_full());
        assert_eq!(heap.insert(3, 1), Err(QueueError::QueueFull));
        assert_eq!(heap.len(), 2);

        heap.extract_min().unwrap();
        heap.extract_max().unwrap();
        assert_eq!(heap.extract_max(), Err(QueueError::QueueEmpty));
    }

    #[test]
    fn full_check_precedes_priority_check() {
        let mut heap = PriorityHeap::create(1).unwrap();
        heap.insert(1, 1).unwrap();
        assert_eq!(heap.insert(2, 0), Err(QueueError::QueueFull));
    }

    #[test]
    fn insert_rejects_non_positive_priority() {
        let mut heap = PriorityHeap::create(3).unwrap();
        assert_eq!(heap.insert(5, 0), Err(QueueError::InvalidPriority(0)));
        assert_eq!(heap.insert(5, -3), Err(QueueError::InvalidPriority(-3)));
        assert!(heap.is_empty());
    }

    #[test]
    fn sequences_are_never_reused() {
        let mut heap = PriorityHeap::create(2).unwrap();
        assert_eq!(heap.insert(1, 1), Ok(0));
        assert_eq!(heap.insert(2, 1), Ok(1));
        heap.extract_min().unwrap();
        assert_eq!(heap.insert(3, 1), Ok(2));
    }

    #[test]
    fn extract_max_from_root_and_leaf_positions() {
        // Single element: the maximum is the root itself.
        let mut heap = PriorityHeap::create(1).unwrap();
        heap.insert(42, 3).unwrap();
        assert_eq!(heap.extract_max(), Ok(42));
        assert!(heap.is_empty());

        // Maximum sitting in the last slot.
        let mut heap = PriorityHeap::create(3).unwrap();
        heap.insert(1, 1).unwrap();
        heap.insert(2, 2).unwrap();
        heap.insert(3, 3).unwrap();
        assert_eq!(heap.extract_max(), Ok(3));
        assert_eq!(heap.extract_min(), Ok(1));
        assert_eq!(heap.extract_min(), Ok(2));
    }
}
