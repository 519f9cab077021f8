//! Fuzz target for the Connection state machine
//!
//! Feeds arbitrary frame sequences from several connections into one
//! dispatcher.
//!
//! # Invariants
//!
//! - Every request frame gets exactly one reply, unless the connection closes
//! - A client id is bound to at most one connection at a time
//! - Disconnecting every connection leaves the registry empty

#![no_main]

use std::{collections::HashMap, sync::Arc};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use prioq_proto::{Frame, StatusCode};
use prioq_server::{
    Connection, ConnectionAction, ConnectionState, Dispatcher, DispatcherConfig, LockingMode,
    SystemEnv,
};

#[derive(Debug, Clone, Arbitrary)]
struct Step {
    connection: u8,
    frame: FrameChoice,
}

#[derive(Debug, Clone, Arbitrary)]
enum FrameChoice {
    Open(u8),
    OpenRaw(Vec<u8>),
    Close,
    Write(Vec<u8>),
    Read(u16),
    Invoke { code: u16, arg: Vec<u8> },
    Reply(u16),
}

impl FrameChoice {
    fn build(self) -> Frame {
        match self {
            Self::Open(client_id) => Frame::open(u64::from(client_id % 4)),
            Self::OpenRaw(payload) => Frame::new(Frame::open(0).header, payload),
            Self::Close => Frame::close(),
            Self::Write(payload) => Frame::write(payload),
            Self::Read(len) => Frame::read(len),
            Self::Invoke { code, arg } => Frame::invoke_raw(code, arg),
            Self::Reply(code) => {
                Frame::reply(StatusCode::try_from(code % 11).unwrap_or(StatusCode::Ok), Vec::new())
            },
        }
    }
}

fuzz_target!(|input: (bool, Vec<Step>)| {
    let (per_session, steps) = input;
    let locking = if per_session { LockingMode::PerSession } else { LockingMode::Global };
    let dispatcher =
        Arc::new(Dispatcher::new(SystemEnv::new(), DispatcherConfig { locking, ..Default::default() }));

    let mut connections: HashMap<u8, Connection<SystemEnv>> = HashMap::new();

    for step in steps {
        let id = step.connection % 4;
        let connection = connections
            .entry(id)
            .or_insert_with(|| Connection::new(u64::from(id), Arc::clone(&dispatcher)));

        if connection.state() == ConnectionState::Closed {
            continue;
        }

        let actions = connection.handle_frame(&step.frame.build());
        let replies =
            actions.iter().filter(|a| matches!(a, ConnectionAction::SendFrame(_))).count();
        let closes = actions.iter().filter(|a| matches!(a, ConnectionAction::Close { .. })).count();
        assert!(replies + closes == 1, "one reply or one close per frame: {actions:?}");

        let mut bound: Vec<u64> = connections.values().filter_map(Connection::client_id).collect();
        bound.sort_unstable();
        let before = bound.len();
        bound.dedup();
        assert_eq!(before, bound.len(), "client id bound twice");
    }

    for connection in connections.values_mut() {
        connection.disconnect();
    }
    assert_eq!(dispatcher.session_count(), 0);
});
