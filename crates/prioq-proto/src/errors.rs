//! Protocol-level errors.
//!
//! These cover structural problems with frames only. A well-formed frame that
//! asks for something the session cannot do is not a protocol error; it gets a
//! `Reply` carrying a non-zero [`crate::StatusCode`].

use thiserror::Error;

/// Result alias for wire operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while parsing or building frames.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than a frame header
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Minimum number of bytes required
        expected: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// Header claims more payload than the buffer holds
    #[error("frame truncated: header claims {expected} payload bytes, got {actual}")]
    FrameTruncated {
        /// Payload size claimed by the header
        expected: usize,
        /// Payload bytes actually available
        actual: usize,
    },

    /// Magic number does not match
    #[error("invalid magic number")]
    InvalidMagic,

    /// Protocol version is not supported
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Frame kind byte is not a known [`crate::FrameKind`]
    #[error("unknown frame kind: {0:#04x}")]
    UnknownFrameKind(u8),

    /// Payload exceeds the protocol limit
    #[error("payload too large: {size} bytes (max {max})")]
    PayloadTooLarge {
        /// Payload size in bytes
        size: usize,
        /// Maximum allowed payload size
        max: usize,
    },

    /// Command code is not a known [`crate::Command`]
    #[error("unknown command code: {0:#06x}")]
    UnknownCommand(u16),

    /// Status code is not a known [`crate::StatusCode`]
    #[error("unknown status code: {0}")]
    UnknownStatus(u16),

    /// Fixed-size payload has the wrong length
    #[error("payload size mismatch: expected {expected} bytes, got {actual}")]
    PayloadSize {
        /// Required payload size
        expected: usize,
        /// Payload size received
        actual: usize,
    },
}
