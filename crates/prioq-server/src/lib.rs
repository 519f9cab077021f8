//! prioq production server.
//!
//! Serves per-client bounded priority queues over TCP using Tokio, with
//! system time and OS randomness.
//!
//! # Architecture
//!
//! The queue logic in [`prioq_core`] is pure. This crate adds the pieces that
//! touch the outside world:
//!
//! - [`SessionRegistry`]: client id → session map
//! - [`Dispatcher`]: owns the registry and the lock(s); the single entry
//!   point for open, close and every queue operation
//! - [`Connection`]: per-connection state machine (frames in, actions out)
//! - [`TcpTransport`]: framed TCP listener
//! - [`Server`]: runtime that accepts connections, executes connection
//!   actions and sweeps idle sessions
//! - [`SystemEnv`]: production environment (real time, OS RNG)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod connection;
mod dispatcher;
mod error;
mod registry;
mod system_env;
mod transport;

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

pub use connection::{Connection, ConnectionAction, ConnectionState};
pub use dispatcher::{DEFAULT_MAX_SESSIONS, Dispatcher, DispatcherConfig, LockingMode};
pub use error::ServerError;
use prioq_core::env::Environment;
pub use registry::{SessionHandle, SessionRegistry};
pub use system_env::SystemEnv;
use tokio::{
    net::TcpStream,
    task::{JoinHandle, JoinSet},
};
pub use transport::{TcpTransport, read_frame, write_frame};

/// Default period between idle-session sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:7878")
    pub bind_address: String,
    /// Dispatcher configuration (policy, locking, limits)
    pub dispatcher: DispatcherConfig,
    /// How often idle sessions are swept when an idle timeout is set
    pub sweep_interval: Duration,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7878".to_string(),
            dispatcher: DispatcherConfig::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

/// Production prioq server.
///
/// Wraps a [`Dispatcher`] with TCP transport and the system environment.
pub struct Server {
    dispatcher: Arc<Dispatcher<SystemEnv>>,
    transport: TcpTransport,
    sweep_interval: Duration,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// - `ServerError::Config` for an invalid bind address or a zero sweep
    ///   interval
    /// - `ServerError::Transport` if the address cannot be bound
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        if config.sweep_interval.is_zero() {
            return Err(ServerError::Config("sweep interval must be non-zero".to_string()));
        }

        let transport = TcpTransport::bind(&config.bind_address).await?;
        let dispatcher = Arc::new(Dispatcher::new(SystemEnv::new(), config.dispatcher));

        Ok(Self { dispatcher, transport, sweep_interval: config.sweep_interval })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.transport.local_addr()
    }

    /// Shared dispatcher (for inspection and tests).
    pub fn dispatcher(&self) -> Arc<Dispatcher<SystemEnv>> {
        Arc::clone(&self.dispatcher)
    }

    /// Run until the process is killed.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` completes, then close every open session.
    ///
    /// Connection tasks are aborted before the sessions are closed, so no
    /// client can reopen a session once shutdown has begun.
    ///
    /// # Errors
    ///
    /// - `ServerError::Internal` if the idle sweeper stops on its own
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = %self.transport.local_addr()?, "server listening");

        let mut sweeper = self.dispatcher.config().idle_timeout.map(|timeout| {
            tracing::info!(?timeout, interval = ?self.sweep_interval, "idle sweeper enabled");
            tokio::spawn(sweep_idle(Arc::clone(&self.dispatcher), self.sweep_interval))
        });

        tokio::pin!(shutdown);

        let mut connections = JoinSet::new();

        let result = loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break Ok(());
                },
                exit = sweeper_exit(&mut sweeper) => {
                    break Err(ServerError::Internal(format!("idle sweeper stopped: {exit:?}")));
                },
                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished
                        && e.is_panic()
                    {
                        tracing::error!("connection task panicked: {}", e);
                    }
                },
                accepted = self.transport.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let dispatcher = Arc::clone(&self.dispatcher);
                        connections.spawn(async move {
                            if let Err(e) = handle_connection(stream, peer, dispatcher).await {
                                tracing::warn!(%peer, "connection error: {}", e);
                            }
                        });
                    },
                    Err(e) => {
                        tracing::error!("accept error: {}", e);
                    },
                },
            }
        };

        if let Some(handle) = sweeper.take() {
            handle.abort();
        }

        let live = connections.len();
        connections.shutdown().await;
        tracing::info!(connections = live, "connections closed");

        self.dispatcher.shutdown();
        result
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("dispatcher", &self.dispatcher)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

/// Periodically close sessions that have been idle too long.
async fn sweep_idle<E: Environment>(dispatcher: Arc<Dispatcher<E>>, interval: Duration) {
    loop {
        dispatcher.env().sleep(interval).await;

        let expired = dispatcher.expire_idle();
        if !expired.is_empty() {
            tracing::debug!(count = expired.len(), "idle sweep closed sessions");
        }
    }
}

/// Resolves only if the sweeper task ends; pends forever without one.
async fn sweeper_exit(sweeper: &mut Option<JoinHandle<()>>) -> Result<(), tokio::task::JoinError> {
    match sweeper {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// Drive one TCP connection until it closes.
///
/// The bound session, if any, is closed however the loop ends.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Arc<Dispatcher<SystemEnv>>,
) -> Result<(), ServerError> {
    let (mut reader, mut writer) = stream.into_split();
    let mut connection = Connection::new(dispatcher.env().random_u64(), dispatcher);
    let connection_id = connection.connection_id();
    tracing::debug!(connection_id, %peer, "new connection");

    let result = 'frames: loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };

        for action in connection.handle_frame(&frame) {
            match action {
                ConnectionAction::SendFrame(reply) => {
                    if let Err(e) = write_frame(&mut writer, &reply).await {
                        break 'frames Err(e);
                    }
                },
                ConnectionAction::Close { reason } => {
                    tracing::info!(connection_id, %reason, "closing connection");
                    break 'frames Ok(());
                },
            }
        }
    };

    connection.disconnect();
    tracing::debug!(connection_id, "connection closed");
    result
}
