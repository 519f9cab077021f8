//! Fuzz target for the Session state machine behind both adapters
//!
//! # Strategy
//!
//! - Mixed shapes: streaming writes/reads and command invocations on one
//!   session, in any order
//! - Boundary capacities: 0, 1, 100, 101, negative, u8::MAX
//! - Boundary priorities: 0, 1, negative, i32::MAX
//! - Unknown command codes and wrong argument sizes
//!
//! # Invariants
//!
//! - A rejected request never changes phase, queue or pending value
//! - The heap property holds after every request
//! - Queue size never exceeds capacity
//! - Size changes only through a successful insert (+1) or extract (-1)

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use prioq_core::{
    CapacityPolicy, Session,
    protocol::{Request, adapter_for},
};
use prioq_proto::Command;

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    Write(Vec<u8>),
    Read(u8),
    Invoke { code: CodeChoice, arg: ArgChoice },
}

#[derive(Debug, Clone, Arbitrary)]
enum CodeChoice {
    SetCapacity,
    InsertValue,
    InsertPriority,
    GetInfo,
    GetMin,
    GetMax,
    Raw(u16),
}

#[derive(Debug, Clone, Arbitrary)]
enum ArgChoice {
    Word(i32),
    Boundary(Boundary),
    Bytes(Vec<u8>),
    Empty,
}

#[derive(Debug, Clone, Copy, Arbitrary)]
enum Boundary {
    Zero,
    One,
    MaxCapacity,
    OverCapacity,
    Negative,
    Max,
}

impl Boundary {
    fn value(self) -> i32 {
        match self {
            Self::Zero => 0,
            Self::One => 1,
            Self::MaxCapacity => 100,
            Self::OverCapacity => 101,
            Self::Negative => -1,
            Self::Max => i32::MAX,
        }
    }
}

fn to_request(input: Input) -> Request {
    match input {
        Input::Write(payload) => Request::Write(Bytes::from(payload)),
        Input::Read(len) => Request::Read { len: usize::from(len) },
        Input::Invoke { code, arg } => {
            let code = match code {
                CodeChoice::SetCapacity => Command::SetCapacity.to_u16(),
                CodeChoice::InsertValue => Command::InsertValue.to_u16(),
                CodeChoice::InsertPriority => Command::InsertPriority.to_u16(),
                CodeChoice::GetInfo => Command::GetInfo.to_u16(),
                CodeChoice::GetMin => Command::GetMin.to_u16(),
                CodeChoice::GetMax => Command::GetMax.to_u16(),
                CodeChoice::Raw(code) => code,
            };
            let arg = match arg {
                ArgChoice::Word(v) => Bytes::copy_from_slice(&v.to_be_bytes()),
                ArgChoice::Boundary(b) => Bytes::copy_from_slice(&b.value().to_be_bytes()),
                ArgChoice::Bytes(bytes) => Bytes::from(bytes),
                ArgChoice::Empty => Bytes::new(),
            };
            Request::Invoke { code, arg }
        },
    }
}

fuzz_target!(|inputs: Vec<Input>| {
    let start = Instant::now();

    for policy in [CapacityPolicy::Redeclare, CapacityPolicy::Once] {
        let mut session = Session::new(1, policy, start);

        for (tick, input) in inputs.iter().cloned().enumerate() {
            let request = to_request(input);
            let before = session.clone();
            let size_before = session.queue().map(|q| q.len());

            let adapter = adapter_for(&request);
            let result = adapter
                .decode(session.phase(), &request)
                .and_then(|operation| session.apply(operation));

            if result.is_err() {
                assert_eq!(session.phase(), before.phase());
                assert_eq!(session.pending_value(), before.pending_value());
                assert_eq!(session.queue(), before.queue());
            }

            if let Some(queue) = session.queue() {
                assert!(queue.is_valid(), "heap property violated");
                assert!(queue.len() <= queue.capacity());

                if let (Ok(_), Some(size_before)) = (&result, size_before) {
                    let delta = queue.len() as i64 - size_before as i64;
                    assert!((-1..=1).contains(&delta) || queue.is_empty());
                }
            }

            session.touch(start + Duration::from_millis(tick as u64));
        }
    }
});
