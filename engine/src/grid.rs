// grid.rs - Grid types for the Game of Life engine

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const ALIVE: u8 = 255;                            // Wire value of a live cell
pub const DEAD: u8 = 0;                               // Wire value of a dead cell

/// Coordinate of a single cell, `x` across and `y` down.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: usize,
    pub y: usize,
}

/// A height x width matrix of cells stored densely in row-major order.
///
/// Every cell is either [`ALIVE`] or [`DEAD`]; the constructors and the
/// deserialiser refuse anything else, so the stepper never has to guess.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawGrid")]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

#[derive(Deserialize)]
struct RawGrid {
    width: usize,
    height: usize,
    cells: Vec<u8>,
}

impl TryFrom<RawGrid> for Grid {
    type Error = EngineError;

    fn try_from(raw: RawGrid) -> Result<Self, Self::Error> {
        Grid::from_cells(raw.width, raw.height, raw.cells)
    }
}

impl Grid {
    /// All-dead grid of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            // Overflowing sizes fail the allocation instead of wrapping.
            cells: vec![DEAD; width.saturating_mul(height)],
        }
    }

    /// The 0x0 grid reported before any run has been started.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Result<Self, EngineError> {
        let expected = width.checked_mul(height).ok_or_else(|| {
            EngineError::InvalidParameters(format!("grid of {width}x{height} is too large"))
        })?;
        if cells.len() != expected {
            return Err(EngineError::InvalidParameters(format!(
                "grid of {width}x{height} needs {expected} cells, got {}",
                cells.len()
            )));
        }
        if let Some(bad) = cells.iter().find(|&&c| c != ALIVE && c != DEAD) {
            return Err(EngineError::InvalidParameters(format!(
                "cell value {bad} is neither {DEAD} nor {ALIVE}"
            )));
        }
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        self.cells[self.index(x, y)] == ALIVE
    }

    pub fn set(&mut self, x: usize, y: usize, alive: bool) {
        let idx = self.index(x, y);
        self.cells[idx] = if alive { ALIVE } else { DEAD };
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut [u8]> {
        // chunks_mut panics on zero, and a zero-width grid has no rows anyway
        self.cells.chunks_mut(self.width.max(1))
    }

    pub fn alive_count(&self) -> u64 {
        self.cells.iter().filter(|&&c| c == ALIVE).count() as u64
    }

    /// Alive cells in row-major order.
    pub fn alive_cells(&self) -> Vec<Cell> {
        let mut alive = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if self.is_alive(x, y) {
                    alive.push(Cell { x, y });
                }
            }
        }
        alive
    }
}
