// main.rs - Game of Life controller

use std::io::BufRead;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gol_controller::session::{self, DEFAULT_POLL_INTERVAL};
use gol_controller::{Seed, SessionConfig};
use gol_engine::RunParameters;

/// Runs Game of Life on a remote engine. Type s, p or q followed by Enter
/// to save, pause/resume or quit.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine address as host:port.
    #[arg(long, env = "GOL_SERVER", default_value = "127.0.0.1:8030")]
    server: String,
    /// Number of generations to run.
    #[arg(long, default_value_t = 10_000_000_000)]
    turns: u64,
    /// Worker-count hint passed to the engine.
    #[arg(short = 't', long, default_value_t = 8, value_parser = clap::value_parser!(u32).range(1..))]
    threads: u32,
    #[arg(short = 'w', long, default_value_t = 512)]
    width: usize,
    #[arg(short = 'H', long, default_value_t = 512)]
    height: usize,
    /// Seed the grid with a named pattern (block, glider, glider-gun, ...).
    #[arg(long, conflicts_with = "seed")]
    pattern: Option<String>,
    /// Seed the grid with a deterministic random fill.
    #[arg(long, default_value_t = 1)]
    seed: u32,
    /// Milliseconds between alive-cell polls.
    #[arg(
        long = "poll-interval-ms",
        value_name = "MILLISECONDS",
        default_value_t = DEFAULT_POLL_INTERVAL.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval_ms: u64,
}

impl Cli {
    fn session_config(self) -> SessionConfig {
        SessionConfig {
            server: self.server,
            params: RunParameters {
                turns: self.turns,
                threads: self.threads,
                image_width: self.width,
                image_height: self.height,
            },
            seed: match self.pattern {
                Some(name) => Seed::Pattern(name),
                None => Seed::Random(self.seed),
            },
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

/// Forwards the first character of each stdin line as a key press.
///
/// Runs on a plain thread: a blocked stdin read must not hold up exit.
fn forward_keys(keys: mpsc::Sender<char>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if let Some(key) = line.trim().chars().next() {
                if keys.blocking_send(key).is_err() {
                    break;
                }
            }
        }
        debug!("stdin closed");
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = Cli::parse().session_config();
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (keys_tx, keys_rx) = mpsc::channel(8);
    forward_keys(keys_tx);

    let printer = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            println!("{event}");
        }
    });

    session::run(config, events_tx, keys_rx).await.context("session failed")?;
    printer.await?;
    Ok(())
}
