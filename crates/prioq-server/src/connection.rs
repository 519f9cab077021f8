//! Per-connection state machine.
//!
//! Binds at most one client identity to a transport connection and turns
//! inbound frames into dispatcher calls. Uses the action pattern: frames go
//! in, actions for the runtime come out. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌─────────┐   Open    ┌────────────────┐
//! │ Unbound │──────────>│ Bound(client)  │
//! └─────────┘<──────────└────────────────┘
//!      │       Close          │
//!      │ Reply / disconnect   │ Reply / disconnect
//!      ↓                      ↓
//! ┌──────────────────────────────────────┐
//! │                Closed                │
//! └──────────────────────────────────────┘
//! ```
//!
//! Every request frame gets exactly one `Reply`. Leaving `Bound` by any path
//! other than an explicit `Close` still closes the client's session.

use std::sync::Arc;

use bytes::Bytes;
use prioq_core::{ClientId, QueueError, Request, env::Environment};
use prioq_proto::{Frame, FrameKind, StatusCode};

use crate::dispatcher::Dispatcher;

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Send this frame to the peer
    SendFrame(Frame),

    /// Close the transport connection
    Close {
        /// Reason for closing the connection
        reason: String,
    },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No client identity bound yet
    Unbound,
    /// Requests act on this client's session
    Bound(ClientId),
    /// Connection finished; further frames are ignored
    Closed,
}

/// State machine for one transport connection.
pub struct Connection<E: Environment> {
    connection_id: u64,
    state: ConnectionState,
    dispatcher: Arc<Dispatcher<E>>,
}

impl<E: Environment> Connection<E> {
    /// Create an `Unbound` connection.
    pub fn new(connection_id: u64, dispatcher: Arc<Dispatcher<E>>) -> Self {
        Self { connection_id, state: ConnectionState::Unbound, dispatcher }
    }

    /// Runtime-assigned connection id (for logs).
    pub fn connection_id(&self) -> u64 {
        self.connection_id
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Client bound to this connection, if any.
    pub fn client_id(&self) -> Option<ClientId> {
        match self.state {
            ConnectionState::Bound(client_id) => Some(client_id),
            _ => None,
        }
    }

    /// Process one inbound frame.
    pub fn handle_frame(&mut self, frame: &Frame) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Closed {
            return Vec::new();
        }

        let Some(kind) = frame.kind() else {
            return vec![self.close("frame kind not recognized")];
        };

        let result = match kind {
            FrameKind::Open => self.handle_open(&frame.payload),
            FrameKind::Close => self.handle_close(),
            FrameKind::Write => self.dispatch(Request::Write(frame.payload.clone())),
            FrameKind::Read => {
                if frame.payload.is_empty() {
                    self.dispatch(Request::Read { len: usize::from(frame.header.code()) })
                } else {
                    Err(QueueError::InvalidArgument)
                }
            },
            FrameKind::Invoke => self.dispatch(Request::Invoke {
                code: frame.header.code(),
                arg: frame.payload.clone(),
            }),
            FrameKind::Reply => return vec![self.close("client sent a reply frame")],
        };

        let reply = match result {
            Ok(payload) => Frame::reply(StatusCode::Ok, payload),
            Err(err) => Frame::reply(err.status(), Bytes::new()),
        };
        vec![ConnectionAction::SendFrame(reply)]
    }

    /// Transport went away. Closes the bound session, if any.
    pub fn disconnect(&mut self) {
        self.release();
        self.state = ConnectionState::Closed;
    }

    fn handle_open(&mut self, payload: &[u8]) -> Result<Bytes, QueueError> {
        let client_id: [u8; 8] = payload.try_into().map_err(|_| QueueError::InvalidArgument)?;
        let client_id = ClientId::from_be_bytes(client_id);

        if self.client_id().is_some() {
            return Err(QueueError::AlreadyOpen);
        }

        self.dispatcher.open(client_id)?;
        self.state = ConnectionState::Bound(client_id);
        tracing::debug!(connection_id = self.connection_id, client_id, "connection bound");
        Ok(Bytes::new())
    }

    fn handle_close(&mut self) -> Result<Bytes, QueueError> {
        let client_id = self.client_id().ok_or(QueueError::NotOpen)?;
        self.state = ConnectionState::Unbound;
        self.dispatcher.close(client_id)?;
        Ok(Bytes::new())
    }

    fn dispatch(&mut self, request: Request) -> Result<Bytes, QueueError> {
        let client_id = self.client_id().ok_or(QueueError::NotOpen)?;

        let result = self.dispatcher.handle(client_id, &request);
        if result == Err(QueueError::NotOpen) {
            // Session expired or was shut down under us.
            tracing::debug!(connection_id = self.connection_id, client_id, "bound session gone");
            self.state = ConnectionState::Unbound;
        }
        result
    }

    fn close(&mut self, reason: &str) -> ConnectionAction {
        tracing::warn!(connection_id = self.connection_id, reason, "closing connection");
        self.disconnect();
        ConnectionAction::Close { reason: reason.to_string() }
    }

    fn release(&mut self) {
        if let Some(client_id) = self.client_id() {
            if let Err(err) = self.dispatcher.close(client_id) {
                tracing::debug!(client_id, %err, "session already gone on disconnect");
            }
            self.state = ConnectionState::Unbound;
        }
    }
}

impl<E: Environment> std::fmt::Debug for Connection<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connection_id", &self.connection_id)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
