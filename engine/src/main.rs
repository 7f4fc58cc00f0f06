// main.rs - Game of Life engine server

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gol_engine::config::{DEFAULT_CANCEL_TIMEOUT, DEFAULT_PORT};
use gol_engine::{Engine, EngineConfig, server};

/// Serves the Game of Life engine to any number of controllers.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,
    /// Port to listen on.
    #[arg(short, long, env = "GOL_ENGINE_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    /// How long a cancel-and-restart waits for the old run before giving up.
    #[arg(
        long = "cancel-timeout-ms",
        value_name = "MILLISECONDS",
        default_value_t = DEFAULT_CANCEL_TIMEOUT.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    cancel_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::default().with_cancel_timeout(Duration::from_millis(cli.cancel_timeout_ms));

    let listener = TcpListener::bind((cli.bind.as_str(), cli.port))
        .await
        .with_context(|| format!("unable to listen on {}:{}", cli.bind, cli.port))?;
    info!(addr = %listener.local_addr()?, cancel_timeout = ?config.cancel_timeout, "engine listening");

    server::serve(listener, Engine::new(config), async {
        // Without a signal handler there is nothing to wait for; keep serving.
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    })
    .await;
    Ok(())
}
