// service.rs - the remote operations, mapped one-to-one onto the run coordinator

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::coordinator::{RunCoordinator, Snapshot};
use crate::error::EngineError;
use crate::wire::{Reply, Request, SaveReply};

/// Cheaply cloneable handle to the engine; one per connection task.
#[derive(Clone)]
pub struct Engine {
    coordinator: Arc<RunCoordinator>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            coordinator: RunCoordinator::new(config),
        }
    }

    pub fn coordinator(&self) -> &Arc<RunCoordinator> {
        &self.coordinator
    }

    pub async fn handle(&self, request: Request) -> Result<Reply, EngineError> {
        match request {
            Request::IsAlreadyRunning(params) => self
                .coordinator
                .is_already_running(&params)
                .await
                .map(Reply::Running),
            Request::Start { params, world } => self
                .coordinator
                .start(params, world)
                .await
                .map(|world| Reply::World(Arc::unwrap_or_clone(world))),
            Request::Continue => self
                .coordinator
                .continue_run()
                .await
                .map(|world| Reply::World(Arc::unwrap_or_clone(world))),
            Request::Save => Ok(Reply::Snapshot(self.coordinator.save().into())),
            Request::Pause => self.coordinator.pause().map(|s| Reply::Snapshot(s.into())),
            Request::Execute => self.coordinator.execute().map(|s| Reply::Snapshot(s.into())),
            Request::Quit => Ok(Reply::Turns(self.coordinator.quit())),
            Request::GetAliveCells => Ok(Reply::AliveCells(self.coordinator.alive_cells())),
        }
    }
}

impl From<Snapshot> for SaveReply {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            completed_turns: snapshot.completed_turns,
            world: Arc::unwrap_or_clone(snapshot.world),
        }
    }
}
