//! Wire format for the prioq queue service.
//!
//! Every message on the wire is a [`Frame`]: a fixed 12-byte [`FrameHeader`]
//! followed by a small payload. The header's [`FrameKind`] selects which of
//! the transport primitives the frame carries (open, close, streaming
//! write/read, command invoke, reply).
//!
//! This crate knows nothing about queues or sessions. It only guarantees that
//! a frame is structurally valid; interpreting payloads against a session's
//! protocol phase is the job of the adapters in `prioq-core`.

mod command;
pub mod errors;
mod frame;
mod header;
mod status;

pub use command::{Command, QueueInfo};
pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use header::{FrameHeader, FrameKind};
pub use status::StatusCode;
