//! prioq server binary.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: global lock, capacity may be redeclared, no idle expiry
//! prioq-server --bind 0.0.0.0:7878
//!
//! # Per-session locking, one capacity declaration per session, expire
//! # sessions idle for five minutes
//! prioq-server --locking per-session --capacity-policy once --idle-timeout-secs 300
//! ```

use std::time::Duration;

use clap::{Parser, ValueEnum};
use prioq_core::CapacityPolicy;
use prioq_server::{DispatcherConfig, LockingMode, Server, ServerRuntimeConfig};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Capacity redeclaration policy
#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Only the first capacity declaration is accepted
    Once,
    /// A new declaration replaces the queue
    Redeclare,
}

impl From<PolicyArg> for CapacityPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Once => Self::Once,
            PolicyArg::Redeclare => Self::Redeclare,
        }
    }
}

/// Lock granularity
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LockingArg {
    /// One lock serializes all clients
    Global,
    /// Registry lock plus one lock per session
    PerSession,
}

impl From<LockingArg> for LockingMode {
    fn from(arg: LockingArg) -> Self {
        match arg {
            LockingArg::Global => Self::Global,
            LockingArg::PerSession => Self::PerSession,
        }
    }
}

/// prioq queue server
#[derive(Parser, Debug)]
#[command(name = "prioq-server")]
#[command(about = "Per-client bounded priority queue server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:7878")]
    bind: String,

    /// Whether capacity may be declared more than once per session
    #[arg(long, value_enum, default_value_t = PolicyArg::Redeclare)]
    capacity_policy: PolicyArg,

    /// Lock granularity
    #[arg(long, value_enum, default_value_t = LockingArg::Global)]
    locking: LockingArg,

    /// Close sessions idle for this many seconds (never, if omitted)
    #[arg(long)]
    idle_timeout_secs: Option<u64>,

    /// Seconds between idle sweeps
    #[arg(long, default_value = "1")]
    sweep_interval_secs: u64,

    /// Maximum concurrently open sessions
    #[arg(long, default_value = "1024")]
    max_sessions: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("prioq server starting");
    tracing::info!("Binding to {}", args.bind);

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        dispatcher: DispatcherConfig {
            capacity_policy: args.capacity_policy.into(),
            locking: args.locking.into(),
            idle_timeout: args.idle_timeout_secs.map(Duration::from_secs),
            max_sessions: args.max_sessions,
        },
        sweep_interval: Duration::from_secs(args.sweep_interval_secs),
    };

    let server = Server::bind(config).await?;

    tracing::info!("Server listening on {}", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
