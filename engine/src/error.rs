// error.rs - error types for the engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors an engine operation reports back to its caller.
///
/// These cross the wire unchanged, so they carry plain data only.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EngineError {
    /// No run is active, and none has completed that could answer instead.
    #[error("no run is active")]
    NotRunning,

    /// A run is already active; attach with Continue instead.
    #[error("a run is already active")]
    AlreadyRunning,

    /// Run parameters or the initial grid are malformed.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The active run is being cancelled; retry once it has drained.
    #[error("the active run is being cancelled")]
    Busy,

    /// The simulation loop did not acknowledge a cancel in time.
    #[error("cancellation not acknowledged after {waited_ms}ms")]
    CancelTimeout {
        /// How long the caller waited.
        waited_ms: u64,
    },

    /// The run's task went away without delivering a grid.
    #[error("run ended without delivering a grid")]
    Interrupted,

    /// The request frame could not be decoded.
    #[error("malformed request: {0}")]
    Malformed(String),
}
