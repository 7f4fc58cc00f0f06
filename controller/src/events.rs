// events.rs - what a session reports back to its front-end

use std::fmt;

use gol_engine::{Cell, Grid};

/// Controller-side state, as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Paused,
    Executing,
    Quitting,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            State::Paused => "Paused",
            State::Executing => "Executing",
            State::Quitting => "Quitting",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Periodic poll result.
    AliveCellsCount { completed_turns: u64, cells_count: u64 },
    StateChange { completed_turns: u64, new_state: State },
    /// A grid is ready to be written out as `filename`.
    ImageOutputComplete { completed_turns: u64, filename: String, world: Grid },
    /// The run delivered its final grid.
    FinalTurnComplete { completed_turns: u64, alive: Vec<Cell> },
}

impl Event {
    pub fn completed_turns(&self) -> u64 {
        match self {
            Event::AliveCellsCount { completed_turns, .. }
            | Event::StateChange { completed_turns, .. }
            | Event::ImageOutputComplete { completed_turns, .. }
            | Event::FinalTurnComplete { completed_turns, .. } => *completed_turns,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::AliveCellsCount { completed_turns, cells_count } => {
                write!(f, "Turn {completed_turns}: {cells_count} cells alive")
            }
            Event::StateChange { completed_turns, new_state } => {
                write!(f, "Turn {completed_turns}: {new_state}")
            }
            Event::ImageOutputComplete { completed_turns, filename, .. } => {
                write!(f, "Turn {completed_turns}: image {filename} ready")
            }
            Event::FinalTurnComplete { completed_turns, alive } => {
                write!(f, "Turn {completed_turns}: finished with {} cells alive", alive.len())
            }
        }
    }
}
