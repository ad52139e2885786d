//! Fixed-size toroidal grid with split cell storage.
//!
//! Cells live in two flat `Vec<u8>` buffers indexed `y * width + x`, one byte
//! per cell (`1` alive, `0` dead). A phase bit selects which buffer is current;
//! `swap` flips it, so advancing never copies cell data.
//! The grid itself does not wrap coordinates; wrap-around belongs to the rule.

use crate::error::{LifeError, LifeResult};

pub const ALIVE_SYMBOL: char = 'x';
pub const DEAD_SYMBOL: char = '.';

pub(crate) const ALIVE: u8 = 1;
pub(crate) const DEAD: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellState {
    Dead,
    Alive,
}

impl CellState {
    #[inline(always)]
    pub fn is_alive(self) -> bool {
        self == CellState::Alive
    }

    #[inline(always)]
    pub(crate) fn from_byte(byte: u8) -> Self {
        if byte != DEAD {
            CellState::Alive
        } else {
            CellState::Dead
        }
    }

    #[inline(always)]
    pub(crate) fn to_byte(self) -> u8 {
        match self {
            CellState::Alive => ALIVE,
            CellState::Dead => DEAD,
        }
    }

    pub fn from_symbol(symbol: char) -> Self {
        if symbol == ALIVE_SYMBOL {
            CellState::Alive
        } else {
            CellState::Dead
        }
    }

    pub fn symbol(self) -> char {
        match self {
            CellState::Alive => ALIVE_SYMBOL,
            CellState::Dead => DEAD_SYMBOL,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Grid {
    width: usize,
    height: usize,
    /// `cells[phase]` = current (read), `cells[1 - phase]` = next (write).
    cells: [Vec<u8>; 2],
    phase: usize,
}

impl Grid {
    /// All-dead grid of the given size.
    pub fn new(width: usize, height: usize) -> LifeResult<Self> {
        if width == 0 || height == 0 {
            return Err(LifeError::config(format!(
                "grid dimensions must be at least 1x1, got {width}x{height}"
            )));
        }
        let len = width
            .checked_mul(height)
            .ok_or_else(|| LifeError::config(format!("grid {width}x{height} is too large")))?;
        Ok(Self {
            width,
            height,
            cells: [vec![DEAD; len], vec![DEAD; len]],
            phase: 0,
        })
    }

    /// Build a grid from row strings. Row `y`, column `x` is alive iff it is
    /// `ALIVE_SYMBOL`; every other symbol is dead.
    ///
    /// Line numbers in errors are snapshot lines: row 0 is line 2.
    pub fn load<S: AsRef<str>>(rows: &[S], width: usize, height: usize) -> LifeResult<Self> {
        if width == 0 || height == 0 {
            return Err(LifeError::malformed(
                1,
                format!("dimensions must be at least 1x1, got {width}x{height}"),
            ));
        }
        if rows.len() != height {
            return Err(LifeError::malformed(
                rows.len().min(height) + 2,
                format!("expected {height} rows, found {}", rows.len()),
            ));
        }

        for (y, row) in rows.iter().enumerate() {
            let columns = row.as_ref().chars().count();
            if columns != width {
                let kind = if columns < width { "short" } else { "long" };
                return Err(LifeError::malformed(
                    y + 2,
                    format!("row {y} is too {kind}: expected {width} cells, found {columns}"),
                ));
            }
        }

        let mut grid = Self::new(width, height)
            .map_err(|err| LifeError::malformed(1, err.to_string()))?;
        let current = &mut grid.cells[grid.phase];
        for (dst, row) in current.chunks_exact_mut(width).zip(rows) {
            for (cell, symbol) in dst.iter_mut().zip(row.as_ref().chars()) {
                *cell = CellState::from_symbol(symbol).to_byte();
            }
        }
        Ok(grid)
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells (`width * height`).
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    /// Bounds-checked read of the current generation.
    pub fn cell(&self, x: usize, y: usize) -> Option<CellState> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(CellState::from_byte(self.cells[self.phase][self.index(x, y)]))
    }

    pub fn is_alive(&self, x: usize, y: usize) -> bool {
        self.cell(x, y).is_some_and(CellState::is_alive)
    }

    /// Edit the current generation between advances.
    pub fn set_cell(&mut self, x: usize, y: usize, state: CellState) -> LifeResult<()> {
        if x >= self.width || y >= self.height {
            return Err(LifeError::config(format!(
                "cell ({x},{y}) outside {}x{} grid",
                self.width, self.height
            )));
        }
        let idx = self.index(x, y);
        self.cells[self.phase][idx] = state.to_byte();
        Ok(())
    }

    /// Current buffer, one byte per cell.
    #[inline(always)]
    pub fn current(&self) -> &[u8] {
        &self.cells[self.phase]
    }

    /// Read side (`current`) and write side (`next`) for one generation.
    #[inline(always)]
    pub fn split_buffers(&mut self) -> (&[u8], &mut [u8]) {
        let [a, b] = &mut self.cells;
        if self.phase == 0 {
            (a.as_slice(), b.as_mut_slice())
        } else {
            (b.as_slice(), a.as_mut_slice())
        }
    }

    /// Make `next` the current generation.
    #[inline(always)]
    pub fn swap(&mut self) {
        self.phase ^= 1;
    }

    pub fn population(&self) -> u64 {
        self.current().iter().filter(|&&c| c != DEAD).count() as u64
    }

    /// Render the current generation as rows of `ALIVE_SYMBOL`/`DEAD_SYMBOL`.
    pub fn serialize(&self) -> Vec<String> {
        self.current()
            .chunks_exact(self.width)
            .map(|row| {
                row.iter()
                    .map(|&c| CellState::from_byte(c).symbol())
                    .collect()
            })
            .collect()
    }
}

impl PartialEq for Grid {
    /// Grids are equal when dimensions and current generations match.
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.current() == other.current()
    }
}

impl Eq for Grid {}
