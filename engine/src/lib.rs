//! Game of Life engine served over TCP.
//!
//! A single simulation loop advances the authoritative grid while any
//! number of remote callers start, attach to, pause, resume and inspect
//! the current run.
//!
//! # Example
//!
//! ```no_run
//! use gol_engine::{Engine, EngineClient, EngineConfig, RunParameters, patterns, server};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8030").await?;
//! tokio::spawn(server::serve(listener, Engine::new(EngineConfig::default()), std::future::pending()));
//!
//! let client = EngineClient::connect("127.0.0.1:8030").await?;
//! let params = RunParameters { turns: 100, threads: 1, image_width: 64, image_height: 64 };
//! if !client.is_already_running(params).await? {
//!     let seed = patterns::random_grid(64, 64, 1);
//!     let last = client.start(params, seed).await?;
//!     println!("{} cells alive", last.alive_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod grid;
pub mod params;
pub mod patterns;
pub mod server;
pub mod service;
pub mod stepper;
pub mod wire;

mod simulation;

pub use client::{ClientError, EngineClient};
pub use config::EngineConfig;
pub use coordinator::{LoopStats, RunCoordinator, RunState, Snapshot};
pub use error::EngineError;
pub use grid::{Cell, Grid};
pub use params::{Progress, RunParameters};
pub use service::Engine;
pub use wire::SaveReply;
