//! Server error types.

use std::fmt;

use prioq_proto::ProtocolError;

/// Errors that can occur in the server runtime.
///
/// Queue-level failures never show up here; they travel back to the client
/// as a `Reply` status. These are the failures of the runtime itself.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, zero sweep interval).
    ///
    /// Fatal at startup. Fix configuration and restart.
    Config(String),

    /// Transport/network error (bind failure, socket I/O).
    ///
    /// Fatal for the affected connection. A bind failure is fatal for the
    /// server.
    Transport(String),

    /// Malformed frame from a client.
    ///
    /// The connection is closed and the session it bound is closed with it.
    /// Other clients are unaffected.
    Protocol(ProtocolError),

    /// Internal error (a background task stopped unexpectedly).
    ///
    /// Indicates a bug.
    Internal(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Protocol(err) => write!(f, "protocol error: {err}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ProtocolError> for ServerError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn server_error_display() {
        let err = ServerError::Config("invalid bind address 'x'".to_string());
        assert_eq!(err.to_string(), "configuration error: invalid bind address 'x'");

        let err = ServerError::from(ProtocolError::InvalidMagic);
        assert!(err.to_string().starts_with("protocol error: "));
        assert!(err.source().is_some());
    }

    #[test]
    fn io_errors_are_transport_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = ServerError::from(io);
        assert!(matches!(err, ServerError::Transport(_)));
        assert!(err.source().is_none());
    }
}
