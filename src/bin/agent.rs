//! openvox-noop agent
//!
//! One process per managed node. Keeps a local clone of the configuration
//! code repository and exposes the apply / last-apply RPCs the driver fans
//! out to.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use openvox_noop::api;
use openvox_noop::config::AgentConfig;
use openvox_noop::AgentState;

#[derive(Parser, Debug)]
#[command(
    name = "openvox-noop-agent",
    version,
    about = "Per-node agent running configuration noops on request"
)]
struct Cli {
    /// Remove local state (the code repository clone) before starting
    #[arg(long)]
    clear: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Configuration file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "openvox_noop=debug,info" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AgentConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if cli.clear {
        info!("removing state directory: {:?}", config.state_dir);
        if config.state_dir.exists() {
            std::fs::remove_dir_all(&config.state_dir)
                .context("Failed to remove state directory")?;
        }
    }
    std::fs::create_dir_all(&config.state_dir).context("Failed to create state directory")?;

    let addr: SocketAddr = format!("{}:{}", config.listen_host, config.listen_port)
        .parse()
        .context("Invalid listen address configuration")?;

    let state = AgentState::new(config);
    let app = axum::Router::new()
        .nest("/api/v1", api::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("agent listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
