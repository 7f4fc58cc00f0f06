// simulation.rs - the single task that advances the authoritative grid

use std::sync::Arc;

use tracing::{debug, error, info, trace};

use crate::coordinator::{Checkpoint, Outcome, RunCoordinator};
use crate::grid::Grid;
use crate::params::RunParameters;
use crate::stepper;

/// Runs up to `params.turns` generations starting from `world`.
///
/// Pause and cancel are honoured at generation boundaries only. Each
/// generation is computed on the blocking pool into a fresh grid, so any
/// `Arc<Grid>` already handed out stays frozen.
pub(crate) async fn simulate(coordinator: Arc<RunCoordinator>, params: RunParameters, mut world: Arc<Grid>) {
    coordinator.loop_entered();
    info!("simulation started");

    let mut turn = 0;
    let outcome = loop {
        if turn >= params.turns {
            break Outcome::Finished;
        }

        match coordinator.checkpoint() {
            Checkpoint::Proceed => {}
            Checkpoint::Pause => {
                debug!(turn, "parked");
                coordinator.wait_for_signal().await;
                continue;
            }
            Checkpoint::Cancel => {
                info!(turn, "cancel observed");
                break Outcome::Cancelled;
            }
        }

        let current = Arc::clone(&world);
        let next = match tokio::task::spawn_blocking(move || stepper::step(&current)).await {
            Ok(next) => Arc::new(next),
            Err(err) => {
                error!(turn, %err, "generation task failed, abandoning run");
                break Outcome::Cancelled;
            }
        };

        // A generation finished after a pause or cancel is dropped; the
        // published snapshot stays the one readers were told about.
        if coordinator.publish(Arc::clone(&next), turn + 1) {
            world = next;
            turn += 1;
            trace!(turn, alive = world.alive_count(), "generation published");
        }
    };

    coordinator.conclude(world, outcome);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::config::EngineConfig;
    use crate::coordinator::{RunCoordinator, RunState};
    use crate::params::{Progress, RunParameters};
    use crate::patterns;

    fn block_params(turns: u64) -> RunParameters {
        RunParameters {
            turns,
            threads: 1,
            image_width: 4,
            image_height: 4,
        }
    }

    #[tokio::test]
    async fn finished_run_resets_progress_and_completes() {
        let coordinator = RunCoordinator::new(EngineConfig::default());
        let seed = patterns::centred(4, 4, patterns::find("block").unwrap());

        let final_grid = coordinator.start(block_params(5), seed.clone()).await.unwrap();

        assert_eq!(*final_grid, seed);
        assert_eq!(coordinator.state(), RunState::Completed);
        assert_eq!(coordinator.alive_cells(), Progress::default());

        let stats = coordinator.loop_stats();
        assert_eq!((stats.started, stats.finished, stats.active, stats.peak), (1, 1, 0, 1));
    }

    #[tokio::test]
    async fn zero_turns_hands_back_the_seed() {
        let coordinator = RunCoordinator::new(EngineConfig::default());
        let seed = patterns::random_grid(4, 4, 9);

        let final_grid = coordinator.start(block_params(0), seed.clone()).await.unwrap();

        assert_eq!(*final_grid, seed);
        assert_eq!(coordinator.state(), RunState::Completed);
    }

    #[tokio::test]
    async fn stable_block_reports_constant_alive_count() {
        let coordinator = RunCoordinator::new(EngineConfig::default());
        let mut progress = coordinator.subscribe();
        let seed = patterns::centred(4, 4, patterns::find("block").unwrap());

        let run = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.start(block_params(u64::MAX), seed).await }
        });

        tokio::time::timeout(Duration::from_secs(5), async {
            for _ in 0..20 {
                let p = *progress.wait_for(|p| p.completed_turns > 0).await.unwrap();
                assert_eq!(p.alive_count, 4, "{p:?}");
                progress.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        let paused = coordinator.pause().unwrap();
        assert_eq!(paused.world.alive_count(), 4);
        assert_eq!(coordinator.alive_cells().alive_count, 4);

        // Tear the endless run down through the cancel path.
        let other = RunParameters { image_width: 8, ..block_params(1) };
        assert_eq!(coordinator.is_already_running(&other).await, Ok(false));
        let last = run.await.unwrap().unwrap();
        assert_eq!(last.alive_count(), 4);
        assert_eq!(coordinator.state(), RunState::Idle);
    }
}
