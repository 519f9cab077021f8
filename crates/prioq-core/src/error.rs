//! Error taxonomy for queue and session operations.
//!
//! Every failure is reported synchronously to the caller and never retried
//! internally. Validation always precedes mutation, so a rejected request
//! leaves the session exactly as it was and the client can correct and
//! resubmit.

use prioq_proto::{ProtocolError, StatusCode};
use thiserror::Error;

/// Errors returned by registry, session and heap operations.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueError {
    /// Client already has an open session
    #[error("client already has an open session")]
    AlreadyOpen,

    /// Client has no open session
    #[error("client has no open session")]
    NotOpen,

    /// Capacity has not been declared yet
    #[error("queue capacity has not been declared")]
    NotInitialized,

    /// Declared capacity is out of range
    #[error("capacity {0} outside 1..=100")]
    InvalidCapacity(i32),

    /// Queue is at capacity
    #[error("queue is full")]
    QueueFull,

    /// Queue has no elements
    #[error("queue is empty")]
    QueueEmpty,

    /// Priority is below the minimum legal priority
    #[error("priority {0} must be a positive integer")]
    InvalidPriority(i32),

    /// Request arrived in the wrong protocol phase
    #[error("request out of order for current protocol phase")]
    WrongPhase,

    /// Payload size or shape does not match the request
    #[error("invalid argument: payload does not match request")]
    InvalidArgument,

    /// Resources for the request could not be allocated
    #[error("allocation failure")]
    AllocationFailure,
}

impl QueueError {
    /// Wire status reported for this error.
    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::AlreadyOpen => StatusCode::AlreadyOpen,
            Self::NotOpen => StatusCode::NotOpen,
            Self::NotInitialized => StatusCode::NotInitialized,
            Self::InvalidCapacity(_) => StatusCode::InvalidCapacity,
            Self::QueueFull => StatusCode::QueueFull,
            Self::QueueEmpty => StatusCode::QueueEmpty,
            Self::InvalidPriority(_) => StatusCode::InvalidPriority,
            Self::WrongPhase => StatusCode::WrongPhase,
            Self::InvalidArgument => StatusCode::InvalidArgument,
            Self::AllocationFailure => StatusCode::AllocationFailure,
        }
    }

    /// Returns true if the request could not be served for lack of
    /// resources rather than because the client asked for something illegal.
    ///
    /// Only allocation failures qualify. Everything else is a rejected
    /// request the client can fix.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::AllocationFailure)
    }
}

/// Payload shape errors surface to clients as `InvalidArgument`.
impl From<ProtocolError> for QueueError {
    fn from(_: ProtocolError) -> Self {
        Self::InvalidArgument
    }
}
