// session.rs - one front-end session against a running engine
//
// The session attaches to a compatible run or starts a fresh one, polls the
// alive-cell count on a fixed interval, reacts to key presses, and reports
// everything as `Event`s. Input, polling and run completion are all
// awaited in one `select!`, so nothing spins while idle.

use std::time::Duration;

use gol_engine::{ClientError, EngineClient, EngineError, Grid, RunParameters, patterns};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::events::{Event, State};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("unknown pattern {0:?}")]
    UnknownPattern(String),
}

/// Where the initial grid of a fresh run comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Seed {
    /// A named pattern centred on an empty grid.
    Pattern(String),
    /// Deterministic random fill.
    Random(u32),
}

impl Seed {
    pub fn grid(&self, width: usize, height: usize) -> Result<Grid, SessionError> {
        match self {
            Seed::Pattern(name) => patterns::find(name)
                .map(|pattern| patterns::centred(width, height, pattern))
                .ok_or_else(|| SessionError::UnknownPattern(name.clone())),
            Seed::Random(seed) => Ok(patterns::random_grid(width, height, *seed)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// `host:port` of the engine.
    pub server: String,
    pub params: RunParameters,
    pub seed: Seed,
    pub poll_interval: Duration,
}

/// Drives one session until the run delivers its final grid or `q` is pressed.
///
/// Recognised keys: `s` saves, `p` toggles pause, `q` quits without
/// stopping the run. Closing `keys` only stops input handling.
pub async fn run(
    config: SessionConfig,
    events: mpsc::UnboundedSender<Event>,
    mut keys: mpsc::Receiver<char>,
) -> Result<(), SessionError> {
    let params = config.params;
    let client = EngineClient::connect(config.server.as_str()).await?;

    let attach = client.is_already_running(params).await?;
    let seed = if attach {
        info!("attaching to running engine");
        None
    } else {
        Some(config.seed.grid(params.image_width, params.image_height)?)
    };

    let finished = async {
        match seed {
            Some(world) => match client.start(params, world).await {
                // Someone else started the same run in between.
                Err(ClientError::Remote(EngineError::AlreadyRunning)) => client.continue_run().await,
                other => other,
            },
            None => client.continue_run().await,
        }
    };
    tokio::pin!(finished);

    let mut ticker = tokio::time::interval_at(Instant::now() + config.poll_interval, config.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut paused = false;
    let mut keys_open = true;

    // The front-end may hang up at any time; events are then dropped.
    let emit = |event: Event| {
        let _ = events.send(event);
    };

    loop {
        tokio::select! {
            result = &mut finished => {
                let world = result?;
                emit(Event::FinalTurnComplete {
                    completed_turns: params.turns,
                    alive: world.alive_cells(),
                });
                emit(Event::ImageOutputComplete {
                    completed_turns: params.turns,
                    filename: params.snapshot_name(params.turns),
                    world,
                });
                emit(Event::StateChange {
                    completed_turns: params.turns,
                    new_state: State::Quitting,
                });
                return Ok(());
            }

            key = keys.recv(), if keys_open => match key {
                None => keys_open = false,
                Some('s') => {
                    let saved = client.save().await?;
                    emit(Event::ImageOutputComplete {
                        completed_turns: saved.completed_turns,
                        filename: params.snapshot_name(saved.completed_turns),
                        world: saved.world,
                    });
                }
                Some('q') => {
                    let turns = client.quit().await?;
                    emit(Event::StateChange {
                        completed_turns: turns,
                        new_state: State::Quitting,
                    });
                    return Ok(());
                }
                Some('p') if !paused => {
                    let snapshot = client.pause().await?;
                    paused = true;
                    emit(Event::StateChange {
                        completed_turns: snapshot.completed_turns,
                        new_state: State::Paused,
                    });
                }
                Some('p') => {
                    let snapshot = client.execute().await?;
                    paused = false;
                    ticker.reset();
                    emit(Event::StateChange {
                        completed_turns: snapshot.completed_turns,
                        new_state: State::Executing,
                    });
                }
                Some(other) => debug!(key = %other, "ignored key"),
            },

            _ = ticker.tick(), if !paused => {
                let progress = client.get_alive_cells().await?;
                emit(Event::AliveCellsCount {
                    completed_turns: progress.completed_turns,
                    cells_count: progress.alive_count,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_build_grids_of_the_requested_size() {
        let grid = Seed::Pattern("glider".into()).grid(10, 6).unwrap();
        assert_eq!((grid.width(), grid.height()), (10, 6));
        assert_eq!(grid.alive_count(), 5);

        let grid = Seed::Random(4).grid(7, 9).unwrap();
        assert_eq!((grid.width(), grid.height()), (7, 9));
    }

    #[test]
    fn unknown_pattern_is_an_error() {
        let err = Seed::Pattern("lightweight-spaceship".into()).grid(8, 8).unwrap_err();
        assert!(matches!(err, SessionError::UnknownPattern(_)));
    }
}
