//! metricsum server
//!
//! - `POST /metric/:key` records an event, `GET /metric/:key/sum` reads the sum
//! - Events decay out of the sum after the configured TTL
//! - SIGINT/SIGTERM drain connections within the shutdown grace window
//!
//! Usage: `metricsum-server [config.yaml]`

use tracing_subscriber::{fmt, EnvFilter};

use metricsum_core::error::{MetricSumError, Result};
use metricsum_server::{app_state, config, lifecycle};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "metricsum-server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = std::env::args().nth(1);
    let cfg = config::load(path.as_deref())?;
    let listen = cfg.server.listen_addr()?;

    let state = app_state::AppState::new(cfg)?;

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| MetricSumError::Internal(format!("could not listen on {listen}: {e}")))?;
    tracing::info!(%listen, "server is ready to handle requests");

    lifecycle::serve(listener, state, lifecycle::shutdown_signal())
        .await
        .map_err(|e| MetricSumError::Internal(format!("server failed: {e}")))
}
