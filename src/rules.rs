//! B3/S23 rule evaluation on a toroidal surface.
//!
//! Every backend funnels through `next_cell`; the device kernel in
//! `offload::kernel` encodes the same arithmetic.

use crate::grid::{ALIVE, CellState, DEAD, Grid};

/// Neighbour counts that give birth to a dead cell.
pub const BIRTH_MASK: u16 = 1 << 3;
/// Neighbour counts that keep a live cell alive.
pub const SURVIVAL_MASK: u16 = (1 << 2) | (1 << 3);

/// Offsets of the eight Moore neighbours.
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// `RULE_TABLE[alive][count]` is the next cell byte.
const RULE_TABLE: [[u8; 9]; 2] = build_rule_table();

const fn build_rule_table() -> [[u8; 9]; 2] {
    let mut table = [[DEAD; 9]; 2];
    let mut count = 0;
    while count < 9 {
        if BIRTH_MASK & (1 << count) != 0 {
            table[0][count] = ALIVE;
        }
        if SURVIVAL_MASK & (1 << count) != 0 {
            table[1][count] = ALIVE;
        }
        count += 1;
    }
    table
}

/// Wrap `coord + delta` into `[0, extent)` for `delta` in `-1..=1`.
/// `extent` is a grid dimension and therefore at least 1.
#[inline(always)]
pub(crate) fn wrap(coord: usize, delta: isize, extent: usize) -> usize {
    debug_assert!(extent > 0 && coord < extent && delta.abs() <= 1);
    (coord + extent).wrapping_add_signed(delta) % extent
}

/// Coordinates of the eight toroidal neighbours of `(x, y)`.
#[inline(always)]
pub(crate) fn neighbor_coords(x: usize, y: usize, width: usize, height: usize) -> [(usize, usize); 8] {
    NEIGHBOR_OFFSETS.map(|(dx, dy)| (wrap(x, dx, width), wrap(y, dy, height)))
}

/// Live neighbours of `(x, y)` in a `width x height` buffer, 0..=8.
#[inline(always)]
pub fn neighbor_count(cells: &[u8], width: usize, height: usize, x: usize, y: usize) -> u8 {
    neighbor_coords(x, y, width, height)
        .iter()
        .map(|&(nx, ny)| u8::from(cells[ny * width + nx] != DEAD))
        .sum()
}

/// Next state for a cell given its state and live-neighbour count.
#[inline(always)]
pub fn apply_rule(alive: bool, neighbors: u8) -> bool {
    RULE_TABLE[alive as usize][neighbors as usize] == ALIVE
}

/// Next byte for `(x, y)` read from the `current` buffer.
#[inline(always)]
pub fn next_cell(current: &[u8], width: usize, height: usize, x: usize, y: usize) -> u8 {
    let count = neighbor_count(current, width, height, x, y);
    let alive = current[y * width + x] != DEAD;
    RULE_TABLE[alive as usize][count as usize]
}

/// Next state of `(x, y)` for the grid's current generation.
pub fn next_state(grid: &Grid, x: usize, y: usize) -> CellState {
    let count = neighbor_count(grid.current(), grid.width(), grid.height(), x, y);
    if apply_rule(grid.is_alive(x, y), count) {
        CellState::Alive
    } else {
        CellState::Dead
    }
}
