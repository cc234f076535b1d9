//! onchain-sync
//!
//! ```text
//!     Client Request
//!     ─────────▶ http (request id, trace, timeout, body limit, auth)
//!                  │
//!                  ▼
//!              endpoints ──▶ pipeline (when_defined / when_not_error)
//!                  │
//!        ┌─────────┼───────────────┐
//!        ▼         ▼               ▼
//!    datastore   chain RPC      replay store
//!    (Airtable)  (queue-gated)  (memory / Redis)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use onchain_sync::config::load_config;
use onchain_sync::lifecycle::{spawn_signal_listener, Shutdown};
use onchain_sync::observability::{init_logging, metrics};
use onchain_sync::{AppState, HttpServer};

#[derive(Debug, Parser)]
#[command(name = "onchain-sync", version, about = "Chain to datastore sync service")]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "onchain-sync starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        rpc_max_concurrency = config.chain.rpc_max_concurrency,
        replay_store = if config.relay.redis_url.is_some() { "redis" } else { "memory" },
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = AppState::from_config(config)?;

    let shutdown = Shutdown::new();
    spawn_signal_listener(&shutdown);

    HttpServer::new(state).run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
