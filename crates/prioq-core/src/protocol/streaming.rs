//! Streaming request shape.
//!
//! | Phase | Write | Read |
//! |---|---|---|
//! | `Uninitialized` | 1 byte: capacity | 4 bytes: minimum |
//! | `AwaitingValue` | 4 bytes: value | 4 bytes: minimum |
//! | `AwaitingPriority` | 4 bytes: priority | 4 bytes: minimum |
//!
//! Integers are big-endian. The capacity byte is unsigned.

use bytes::Bytes;

use super::{ProtocolAdapter, Request, encode_reply, read_i32};
use crate::{Operation, Reply, error::QueueError, session::Phase};

/// Size of a capacity write.
const CAPACITY_WRITE: usize = 1;

/// Size of a value or priority write, and of every read.
const WORD: usize = 4;

/// Adapter for phase-dependent `write`/`read` payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingAdapter;

impl ProtocolAdapter for StreamingAdapter {
    fn decode(&self, phase: Phase, request: &Request) -> Result<Operation, QueueError> {
        match request {
            Request::Write(payload) => match phase {
                Phase::Uninitialized => match payload.first() {
                    Some(capacity) if payload.len() == CAPACITY_WRITE => {
                        Ok(Operation::SetCapacity(i32::from(*capacity)))
                    },
                    _ => Err(QueueError::InvalidArgument),
                },
                Phase::AwaitingValue => read_i32(payload).map(Operation::SubmitValue),
                Phase::AwaitingPriority => read_i32(payload).map(Operation::SubmitPriority),
            },
            Request::Read { len } if *len == WORD => Ok(Operation::ExtractMin),
            Request::Read { .. } | Request::Invoke { .. } => Err(QueueError::InvalidArgument),
        }
    }

    fn encode(&self, reply: &Reply) -> Bytes {
        encode_reply(reply)
    }
}
