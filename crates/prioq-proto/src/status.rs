//! Reply status codes.

use crate::errors::{ProtocolError, Result};

/// Status carried in the `code` field of a `Reply` frame.
///
/// `Ok` is zero; every failure has a distinct non-zero code so that a client
/// can tell a full queue from an out-of-order request without parsing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum StatusCode {
    /// Request succeeded
    Ok = 0,
    /// Client identity already has an open session
    AlreadyOpen = 1,
    /// Client identity has no open session
    NotOpen = 2,
    /// Capacity has not been declared yet
    NotInitialized = 3,
    /// Capacity outside `1..=100`
    InvalidCapacity = 4,
    /// Queue is at capacity
    QueueFull = 5,
    /// Queue has no elements
    QueueEmpty = 6,
    /// Priority below 1
    InvalidPriority = 7,
    /// Request arrived in the wrong protocol phase
    WrongPhase = 8,
    /// Payload size or shape does not match the request
    InvalidArgument = 9,
    /// Server could not allocate resources for the request
    AllocationFailure = 10,
}

impl StatusCode {
    /// Parse a status code. `None` if unrecognized.
    #[must_use]
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::AlreadyOpen),
            2 => Some(Self::NotOpen),
            3 => Some(Self::NotInitialized),
            4 => Some(Self::InvalidCapacity),
            5 => Some(Self::QueueFull),
            6 => Some(Self::QueueEmpty),
            7 => Some(Self::InvalidPriority),
            8 => Some(Self::WrongPhase),
            9 => Some(Self::InvalidArgument),
            10 => Some(Self::AllocationFailure),
            _ => None,
        }
    }

    /// Raw status code.
    #[must_use]
    pub fn to_u16(self) -> u16 {
        self as u16
    }
}

impl TryFrom<u16> for StatusCode {
    type Error = ProtocolError;

    fn try_from(code: u16) -> Result<Self> {
        Self::from_u16(code).ok_or(ProtocolError::UnknownStatus(code))
    }
}
