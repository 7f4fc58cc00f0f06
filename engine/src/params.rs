// params.rs - run parameters and progress counters

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::grid::Grid;

/// How a run is configured. Fixed for the lifetime of the run.
///
/// Two runs are compatible iff their parameters compare equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunParameters {
    /// Number of generations to compute.
    pub turns: u64,
    /// Worker-count hint. Recorded and logged; the grid is never sharded.
    pub threads: u32,
    pub image_width: usize,
    pub image_height: usize,
}

impl RunParameters {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.image_width == 0 || self.image_height == 0 {
            return Err(EngineError::InvalidParameters(format!(
                "grid must be at least 1x1, got {}x{}",
                self.image_width, self.image_height
            )));
        }
        if self.threads == 0 {
            return Err(EngineError::InvalidParameters(
                "thread hint must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Checks that `grid` has the dimensions these parameters describe.
    pub fn check_grid(&self, grid: &Grid) -> Result<(), EngineError> {
        if grid.width() != self.image_width || grid.height() != self.image_height {
            return Err(EngineError::InvalidParameters(format!(
                "grid is {}x{} but parameters say {}x{}",
                grid.width(),
                grid.height(),
                self.image_width,
                self.image_height
            )));
        }
        Ok(())
    }

    /// Snapshot name used by the image writer: `<height>x<width>x<turn>`.
    pub fn snapshot_name(&self, turn: u64) -> String {
        format!("{}x{}x{}", self.image_height, self.image_width, turn)
    }
}

/// Counters published once per generation by the simulation loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub completed_turns: u64,
    pub alive_count: u64,
}
