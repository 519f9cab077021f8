//! Command-coded request shape.
//!
//! Each [`Command`] has a fixed argument size and a fixed result size. The
//! session phase does not affect decoding; phase errors come from the
//! session itself.

use bytes::Bytes;
use prioq_proto::Command;

use super::{ProtocolAdapter, Request, encode_reply, read_i32};
use crate::{Operation, Reply, error::QueueError, session::Phase};

/// Adapter for `Invoke` requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandAdapter;

impl ProtocolAdapter for CommandAdapter {
    fn decode(&self, _phase: Phase, request: &Request) -> Result<Operation, QueueError> {
        let Request::Invoke { code, arg } = request else {
            return Err(QueueError::InvalidArgument);
        };

        let command = Command::try_from(*code)?;
        if arg.len() != command.arg_size() {
            return Err(QueueError::InvalidArgument);
        }

        let operation = match command {
            Command::SetCapacity => Operation::SetCapacity(read_i32(arg)?),
            Command::InsertValue => Operation::SubmitValue(read_i32(arg)?),
            Command::InsertPriority => Operation::SubmitPriority(read_i32(arg)?),
            Command::GetInfo => Operation::GetInfo,
            Command::GetMin => Operation::ExtractMin,
            Command::GetMax => Operation::ExtractMax,
        };
        Ok(operation)
    }

    fn encode(&self, reply: &Reply) -> Bytes {
        encode_reply(reply)
    }
}
