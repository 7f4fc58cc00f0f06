// coordinator.rs - the one place that knows what "the current run" is
//
// All run state lives behind a single lock in `RunCoordinator`. The
// simulation loop is the only writer of the grid and progress counters; every
// other operation either reads a consistent snapshot under the lock or asks
// for a state transition. Control requests (pause, resume, cancel) are
// transitions of `RunState`; the loop observes them at its checkpoint
// between generations and is woken through a `Notify` while parked.
//
// Callers that want the final grid register a oneshot slot in the waiter
// set. When the loop concludes, every slot is filled with the same
// `Arc<Grid>`, the counters are reset and the state is flipped, all inside
// one critical section, so nobody can observe a half-finished hand-off.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, oneshot, watch};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::grid::Grid;
use crate::params::{Progress, RunParameters};
use crate::simulation;

/// Process-wide lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Nothing loaded, or the previous run was cancelled and drained.
    Idle,
    Running,
    Paused,
    /// An incompatible start asked the active loop to stop; transient.
    Cancelling,
    /// The last run reached its turn limit. Behaves like `Idle` for restarts.
    Completed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Paused => "paused",
            RunState::Cancelling => "cancelling",
            RunState::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Turn count together with the grid it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub completed_turns: u64,
    pub world: Arc<Grid>,
}

/// Loop instrumentation, used to check that loops never overlap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub started: u64,
    pub finished: u64,
    /// Loops executing right now.
    pub active: usize,
    /// Highest `active` ever seen.
    pub peak: usize,
}

/// What the loop should do before its next generation.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Checkpoint {
    Proceed,
    Pause,
    Cancel,
}

/// How a loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Finished,
    Cancelled,
}

struct Inner {
    state: RunState,
    params: Option<RunParameters>,
    progress: Progress,
    world: Arc<Grid>,
    waiters: Vec<oneshot::Sender<Arc<Grid>>>,
    cancel_acks: Vec<oneshot::Sender<()>>,
    run_id: u64,
}

impl Inner {
    fn snapshot(&self) -> Snapshot {
        Snapshot {
            completed_turns: self.progress.completed_turns,
            world: Arc::clone(&self.world),
        }
    }
}

#[derive(Default)]
struct LoopCounters {
    started: AtomicU64,
    finished: AtomicU64,
    active: AtomicUsize,
    peak: AtomicUsize,
}

pub struct RunCoordinator {
    inner: Mutex<Inner>,
    signal: Notify,
    progress: watch::Sender<Progress>,
    counters: LoopCounters,
    config: EngineConfig,
}

impl RunCoordinator {
    pub fn new(config: EngineConfig) -> Arc<Self> {
        let (progress, _) = watch::channel(Progress::default());
        Arc::new(Self {
            inner: Mutex::new(Inner {
                state: RunState::Idle,
                params: None,
                progress: Progress::default(),
                world: Arc::new(Grid::empty()),
                waiters: Vec::new(),
                cancel_acks: Vec::new(),
                run_id: 0,
            }),
            signal: Notify::new(),
            progress,
            counters: LoopCounters::default(),
            config,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Every critical section leaves Inner consistent, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> RunState {
        self.lock().state
    }

    /// Receives every progress publication, including the resets.
    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Callers currently waiting for the active run's grid.
    pub fn waiter_count(&self) -> usize {
        self.lock().waiters.len()
    }

    pub fn loop_stats(&self) -> LoopStats {
        LoopStats {
            started: self.counters.started.load(Ordering::SeqCst),
            finished: self.counters.finished.load(Ordering::SeqCst),
            active: self.counters.active.load(Ordering::SeqCst),
            peak: self.counters.peak.load(Ordering::SeqCst),
        }
    }

    /// Reports whether a compatible run is active.
    ///
    /// An active run with different parameters is cancelled first, and this
    /// only returns once the old loop has drained its waiters, so a following
    /// `start` cannot overlap with it.
    pub async fn is_already_running(&self, params: &RunParameters) -> Result<bool, EngineError> {
        let ack = {
            let mut inner = self.lock();
            match inner.state {
                RunState::Idle | RunState::Completed => return Ok(false),
                RunState::Running | RunState::Paused if inner.params.as_ref() == Some(params) => {
                    return Ok(true);
                }
                RunState::Running | RunState::Paused => {
                    info!(run = inner.run_id, ?params, "incompatible parameters, cancelling active run");
                    inner.state = RunState::Cancelling;
                }
                RunState::Cancelling => {
                    debug!(run = inner.run_id, "joining in-flight cancellation");
                }
            }
            let (tx, rx) = oneshot::channel();
            inner.cancel_acks.push(tx);
            rx
        };
        self.signal.notify_one();

        match tokio::time::timeout(self.config.cancel_timeout, ack).await {
            Ok(Ok(())) => Ok(false),
            Ok(Err(_)) => Err(EngineError::Interrupted),
            Err(_) => {
                warn!(timeout = ?self.config.cancel_timeout, "simulation loop did not acknowledge cancel");
                Err(EngineError::CancelTimeout {
                    waited_ms: self.config.cancel_timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Launches a new simulation loop and waits for its final grid.
    ///
    /// Only valid while idle or completed.
    pub async fn start(self: &Arc<Self>, params: RunParameters, world: Grid) -> Result<Arc<Grid>, EngineError> {
        params.validate()?;
        params.check_grid(&world)?;

        let world = Arc::new(world);
        let (tx, rx) = oneshot::channel();
        let run_id = {
            let mut inner = self.lock();
            match inner.state {
                RunState::Idle | RunState::Completed => {}
                RunState::Running | RunState::Paused => return Err(EngineError::AlreadyRunning),
                RunState::Cancelling => return Err(EngineError::Busy),
            }
            inner.run_id += 1;
            inner.state = RunState::Running;
            inner.params = Some(params);
            inner.progress = Progress::default();
            inner.world = Arc::clone(&world);
            inner.waiters.push(tx);
            self.progress.send_replace(inner.progress);
            inner.run_id
        };

        let span = info_span!(
            "run",
            id = run_id,
            turns = params.turns,
            width = params.image_width,
            height = params.image_height,
            threads = params.threads,
        );
        tokio::spawn(simulation::simulate(Arc::clone(self), params, world).instrument(span));

        rx.await.map_err(|_| EngineError::Interrupted)
    }

    /// Waits for the active run to hand over its grid.
    ///
    /// After a completed run the last final grid is returned immediately.
    pub async fn continue_run(&self) -> Result<Arc<Grid>, EngineError> {
        let rx = {
            let mut inner = self.lock();
            match inner.state {
                RunState::Idle => return Err(EngineError::NotRunning),
                RunState::Completed => return Ok(Arc::clone(&inner.world)),
                RunState::Running | RunState::Paused | RunState::Cancelling => {
                    let (tx, rx) = oneshot::channel();
                    inner.waiters.push(tx);
                    debug!(run = inner.run_id, waiters = inner.waiters.len(), "waiter registered");
                    rx
                }
            }
        };
        rx.await.map_err(|_| EngineError::Interrupted)
    }

    /// Freezes the active run. Pausing a paused run is a no-op.
    pub fn pause(&self) -> Result<Snapshot, EngineError> {
        let mut inner = self.lock();
        match inner.state {
            RunState::Running => {
                inner.state = RunState::Paused;
                info!(run = inner.run_id, turn = inner.progress.completed_turns, "paused");
            }
            RunState::Paused => debug!(run = inner.run_id, "pause while paused"),
            RunState::Cancelling => return Err(EngineError::Busy),
            RunState::Idle | RunState::Completed => return Err(EngineError::NotRunning),
        }
        Ok(inner.snapshot())
    }

    /// Resumes a paused run. Resuming a running run is a no-op.
    pub fn execute(&self) -> Result<Snapshot, EngineError> {
        let snapshot = {
            let mut inner = self.lock();
            match inner.state {
                RunState::Paused => {
                    inner.state = RunState::Running;
                    info!(run = inner.run_id, turn = inner.progress.completed_turns, "resumed");
                }
                RunState::Running => debug!(run = inner.run_id, "resume while running"),
                RunState::Cancelling => return Err(EngineError::Busy),
                RunState::Idle | RunState::Completed => return Err(EngineError::NotRunning),
            }
            inner.snapshot()
        };
        self.signal.notify_one();
        Ok(snapshot)
    }

    /// Last published turn count and grid, in any state.
    pub fn save(&self) -> Snapshot {
        self.lock().snapshot()
    }

    /// Completed turns as of now. Does not stop anything.
    pub fn quit(&self) -> u64 {
        self.lock().progress.completed_turns
    }

    pub fn alive_cells(&self) -> Progress {
        self.lock().progress
    }

    // Loop-side transitions. Only the simulation loop calls these.

    pub(crate) fn loop_entered(&self) {
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        let active = self.counters.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.peak.fetch_max(active, Ordering::SeqCst);
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint {
        match self.lock().state {
            RunState::Running => Checkpoint::Proceed,
            RunState::Paused => Checkpoint::Pause,
            // Idle and Completed are only ever set by the loop itself on the way out.
            RunState::Cancelling | RunState::Idle | RunState::Completed => Checkpoint::Cancel,
        }
    }

    /// Parks the loop until the next control transition.
    pub(crate) async fn wait_for_signal(&self) {
        self.signal.notified().await;
    }

    /// Commits one generation. Returns false, committing nothing, if the run
    /// was paused or cancelled while the generation was being computed.
    pub(crate) fn publish(&self, world: Arc<Grid>, completed_turns: u64) -> bool {
        let mut inner = self.lock();
        if inner.state != RunState::Running {
            return false;
        }
        inner.progress = Progress {
            completed_turns,
            alive_count: world.alive_count(),
        };
        inner.world = world;
        self.progress.send_replace(inner.progress);
        true
    }

    /// Hands `world` to every waiter and returns the coordinator to rest.
    pub(crate) fn conclude(&self, world: Arc<Grid>, outcome: Outcome) {
        let mut inner = self.lock();

        let served = inner.waiters.len();
        for waiter in inner.waiters.drain(..) {
            // A waiter whose caller hung up has nothing left to deliver to.
            let _ = waiter.send(Arc::clone(&world));
        }

        inner.world = world;
        inner.progress = Progress::default();
        self.progress.send_replace(inner.progress);
        inner.state = match outcome {
            Outcome::Finished => RunState::Completed,
            Outcome::Cancelled => RunState::Idle,
        };

        self.counters.finished.fetch_add(1, Ordering::SeqCst);
        self.counters.active.fetch_sub(1, Ordering::SeqCst);

        for ack in inner.cancel_acks.drain(..) {
            let _ = ack.send(());
        }
        info!(run = inner.run_id, ?outcome, served, "run concluded");
    }
}
