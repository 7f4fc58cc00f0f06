//! Front-end for the Game of Life engine: starts or attaches to a run,
//! polls it, and turns key presses into remote operations.

pub mod events;
pub mod session;

pub use events::{Event, State};
pub use session::{Seed, SessionConfig, SessionError};
