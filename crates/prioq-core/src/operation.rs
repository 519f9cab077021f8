//! Shape-independent request vocabulary.
//!
//! Both wire shapes decode into [`Operation`] and every session returns a
//! [`Reply`], so the session state machine never sees raw bytes.

/// One logical request against a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Declare (or redeclare) the queue capacity
    SetCapacity(i32),
    /// First half of an insertion
    SubmitValue(i32),
    /// Second half of an insertion
    SubmitPriority(i32),
    /// Query size and capacity
    GetInfo,
    /// Remove the minimum-priority element
    ExtractMin,
    /// Remove the maximum-priority element
    ExtractMax,
}

impl Operation {
    /// Whether the operation can change the session.
    #[must_use]
    pub fn is_mutating(self) -> bool {
        !matches!(self, Self::GetInfo)
    }
}

/// Successful outcome of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Accepted, nothing to return
    Done,
    /// An extracted value
    Value(i32),
    /// Current element count and capacity
    Info {
        /// Number of queued elements
        size: i32,
        /// Declared capacity
        capacity: i32,
    },
}
