//! Generation-advance backends.
//!
//! A backend only fills `next` from `current`; `Backend::advance` owns the
//! swap so a failed generation never becomes visible.

mod parallel;
mod sequential;

pub use parallel::{MAX_THREADS, MIN_THREADS, ParallelBackend, auto_thread_count, row_blocks};
pub use sequential::SequentialBackend;

use std::ops::Range;

use crate::error::{LifeError, LifeResult};
use crate::grid::Grid;
use crate::rules::next_cell;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Sequential,
    Parallel,
    Offload,
}

impl BackendKind {
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::Sequential => "sequential",
            BackendKind::Parallel => "parallel",
            BackendKind::Offload => "offload",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = LifeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" | "seq" => Ok(BackendKind::Sequential),
            "parallel" | "omp" => Ok(BackendKind::Parallel),
            "offload" | "ocl" => Ok(BackendKind::Offload),
            other => Err(LifeError::config(format!(
                "unknown backend: {other} (expected sequential, parallel, or offload)"
            ))),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub trait Backend: Send {
    fn kind(&self) -> BackendKind;

    /// Fill `next` with the generation following `current`.
    ///
    /// Both slices are `width * height` cells. Implementations must write
    /// every cell of `next` and must not assume anything about its prior
    /// contents.
    fn compute_next(
        &mut self,
        current: &[u8],
        next: &mut [u8],
        width: usize,
        height: usize,
    ) -> LifeResult<()>;

    /// Advance `grid` by one generation. The swap happens only on success.
    fn advance(&mut self, grid: &mut Grid) -> LifeResult<()> {
        let (width, height) = (grid.width(), grid.height());
        let (current, next) = grid.split_buffers();
        self.compute_next(current, next, width, height)?;
        grid.swap();
        Ok(())
    }

    /// Give back device or thread resources at the end of a run.
    fn release(&mut self) {}
}

/// Compute rows `rows` of the next generation into `out`, which holds exactly
/// those rows.
#[inline]
pub(crate) fn fill_rows(
    current: &[u8],
    width: usize,
    height: usize,
    rows: Range<usize>,
    out: &mut [u8],
) {
    debug_assert_eq!(out.len(), rows.len() * width);
    for (y, out_row) in rows.zip(out.chunks_exact_mut(width)) {
        for (x, cell) in out_row.iter_mut().enumerate() {
            *cell = next_cell(current, width, height, x, y);
        }
    }
}

/// Reject buffers whose length does not match the declared dimensions.
pub(crate) fn check_buffers(
    backend: BackendKind,
    current: &[u8],
    next: &[u8],
    width: usize,
    height: usize,
) -> LifeResult<()> {
    let expected = width * height;
    if current.len() != expected || next.len() != expected {
        return Err(LifeError::runtime(
            backend.name(),
            width,
            height,
            format!(
                "buffer length mismatch: current {} next {} expected {expected}",
                current.len(),
                next.len()
            ),
        ));
    }
    Ok(())
}
