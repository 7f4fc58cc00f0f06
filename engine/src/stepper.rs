// stepper.rs - one generation of Conway's Game of Life on a torus

use crate::grid::{ALIVE, DEAD, Grid};

/// Computes the next generation of `grid`. The input is left untouched.
///
/// Neighbours are the 8 Moore cells with wraparound on both axes, so the
/// grid has no border.
pub fn step(grid: &Grid) -> Grid {
    let mut next = Grid::new(grid.width(), grid.height());
    for (y, row) in next.rows_mut().enumerate() {
        next_row(grid, y, row);
    }
    next
}

/// Fills `out` with the next state of row `y`.
fn next_row(grid: &Grid, y: usize, out: &mut [u8]) {
    for (x, cell) in out.iter_mut().enumerate() {
        let count = live_neighbours(grid, x, y);

        *cell = match (grid.is_alive(x, y), count) {
            (true, 2) | (true, 3) => ALIVE, // Survival
            (false, 3)            => ALIVE, // Birth
            _                     => DEAD,  // Death or stays dead
        };
    }
}

/// Moore neighbourhood as (dx, dy) offsets.
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1,  0),          (1,  0),
    (-1,  1), (0,  1), (1,  1),
];

/// Counts live cells among the 8 neighbours of `(x, y)`, wrapping at the edges.
pub fn live_neighbours(grid: &Grid, x: usize, y: usize) -> u8 {
    let (width, height) = (grid.width(), grid.height());
    let mut count = 0;
    for &(dx, dy) in &NEIGHBOURS {
        if grid.is_alive(wrap(x, dx, width), wrap(y, dy, height)) {
            count += 1;
        }
    }
    count
}

/// `(coordinate + offset) mod extent` for offsets in -1..=1.
#[inline]
fn wrap(coordinate: usize, offset: isize, extent: usize) -> usize {
    (coordinate + extent).wrapping_add_signed(offset) % extent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns;

    fn grid_with(width: usize, height: usize, alive: &[(usize, usize)]) -> Grid {
        let mut grid = Grid::new(width, height);
        for &(x, y) in alive {
            grid.set(x, y, true);
        }
        grid
    }

    /// Straightforward signed-offset version of the rule, used as the oracle.
    fn reference_step(grid: &Grid) -> Grid {
        let (w, h) = (grid.width() as i64, grid.height() as i64);
        let mut next = Grid::new(grid.width(), grid.height());
        for y in 0..h {
            for x in 0..w {
                let mut n = 0;
                for i in -1..=1i64 {
                    for j in -1..=1i64 {
                        if (i != 0 || j != 0)
                            && grid.is_alive((x + j).rem_euclid(w) as usize, (y + i).rem_euclid(h) as usize)
                        {
                            n += 1;
                        }
                    }
                }
                let alive = grid.is_alive(x as usize, y as usize);
                next.set(x as usize, y as usize, (alive && (n == 2 || n == 3)) || (!alive && n == 3));
            }
        }
        next
    }

    #[test]
    fn block_is_stable() {
        let grid = grid_with(4, 4, &[(1, 1), (2, 1), (1, 2), (2, 2)]);
        assert_eq!(step(&grid), grid);
    }

    #[test]
    fn blinker_oscillates_with_period_two() {
        let horizontal = grid_with(5, 5, &[(1, 2), (2, 2), (3, 2)]);
        let vertical = grid_with(5, 5, &[(2, 1), (2, 2), (2, 3)]);

        assert_eq!(step(&horizontal), vertical);
        assert_eq!(step(&vertical), horizontal);
    }

    #[test]
    fn neighbours_wrap_around_corners() {
        // Every other corner is a neighbour of (0, 0) on a torus.
        let grid = grid_with(6, 6, &[(5, 5), (5, 0), (0, 5)]);
        assert_eq!(live_neighbours(&grid, 0, 0), 3);

        // Three live corners around a dead one give birth across the seam.
        let next = step(&grid);
        assert!(next.is_alive(0, 0));
    }

    #[test]
    fn glider_crosses_the_seam() {
        let mut grid = Grid::new(8, 8);
        patterns::apply_pattern(&mut grid, patterns::find("glider").unwrap(), (6, 6));
        let start = grid.clone();

        // A glider moves one cell diagonally every 4 generations: 32 generations
        // on an 8x8 torus bring it back to where it started.
        for _ in 0..32 {
            grid = step(&grid);
            assert_eq!(grid.alive_count(), 5);
        }
        assert_eq!(grid, start);
    }

    #[test]
    fn step_does_not_mutate_its_input() {
        let grid = patterns::random_grid(16, 12, 7);
        let before = grid.clone();
        let _ = step(&grid);
        assert_eq!(grid, before);
    }

    #[test]
    fn matches_reference_on_random_grids() {
        for (seed, (w, h)) in [(1u32, (1, 1)), (2, (1, 7)), (3, (2, 2)), (4, (3, 5)), (5, (16, 16)), (6, (31, 17)), (7, (64, 9))]
            .into_iter()
            .chain((10..30).map(|s| (s, (8 + s as usize, 5 + (s as usize % 7)))))
        {
            let mut grid = patterns::random_grid(w, h, seed);
            for _ in 0..3 {
                let expected = reference_step(&grid);
                grid = step(&grid);
                assert_eq!(grid, expected, "seed {seed}, {w}x{h}");
            }
        }
    }
}
