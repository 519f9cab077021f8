//! Request shapes and their adapters.
//!
//! Clients talk to a session in one of two shapes:
//!
//! - streaming: bare `write`/`read` payloads whose meaning depends on the
//!   session's [`Phase`] (1-byte capacity, then 4-byte value and priority
//!   alternately; reads return the minimum)
//! - command-coded: an explicit [`Command`] code with a fixed-size argument
//!   and result
//!
//! Both shapes decode to the same [`Operation`] and encode the same
//! [`Reply`], so neither the session nor the heap knows which one a client
//! used. A client may mix the two on one session.
//!
//! [`Command`]: prioq_proto::Command

mod command;
mod streaming;

use bytes::Bytes;
pub use command::CommandAdapter;
use prioq_proto::QueueInfo;
pub use streaming::StreamingAdapter;

use crate::{Operation, Reply, error::QueueError, session::Phase};

/// Transport-independent request against a bound session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Streaming write
    Write(Bytes),
    /// Streaming read into a buffer of `len` bytes
    Read {
        /// Caller buffer length
        len: usize,
    },
    /// Command call with a raw code and argument bytes
    Invoke {
        /// Command code
        code: u16,
        /// Argument bytes
        arg: Bytes,
    },
}

/// Translation between one request shape and typed operations.
pub trait ProtocolAdapter {
    /// Decode `request` for a session currently in `phase`.
    ///
    /// # Errors
    ///
    /// - `QueueError::InvalidArgument` if the payload size or shape does not
    ///   match what this adapter expects in `phase`
    fn decode(&self, phase: Phase, request: &Request) -> Result<Operation, QueueError>;

    /// Encode a successful reply as result bytes.
    fn encode(&self, reply: &Reply) -> Bytes;
}

/// Adapter that understands `request`'s shape.
#[must_use]
pub fn adapter_for(request: &Request) -> &'static dyn ProtocolAdapter {
    match request {
        Request::Write(_) | Request::Read { .. } => &StreamingAdapter,
        Request::Invoke { .. } => &CommandAdapter,
    }
}

/// Result bytes for a reply. Identical in both shapes.
fn encode_reply(reply: &Reply) -> Bytes {
    match reply {
        Reply::Done => Bytes::new(),
        Reply::Value(value) => Bytes::copy_from_slice(&value.to_be_bytes()),
        Reply::Info { size, capacity } => {
            Bytes::copy_from_slice(&QueueInfo::new(*size, *capacity).to_bytes())
        },
    }
}

/// Decode a big-endian `i32` from exactly four bytes.
fn read_i32(bytes: &[u8]) -> Result<i32, QueueError> {
    let array: [u8; 4] = bytes.try_into().map_err(|_| QueueError::InvalidArgument)?;
    Ok(i32::from_be_bytes(array))
}
