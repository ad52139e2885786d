//! Row-partitioned multi-threaded backend.
//!
//! Rows are split into `thread_count` contiguous blocks; each block owns a
//! disjoint `&mut` slice of `next`, so workers never synchronise during the
//! compute phase. All reads come from the untouched `current` buffer, which
//! makes the output independent of the partitioning.

use rayon::prelude::*;
use std::ops::Range;
use std::panic::{AssertUnwindSafe, catch_unwind};

use super::{Backend, BackendKind, check_buffers, fill_rows};
use crate::error::{LifeError, LifeResult};

pub const MIN_THREADS: usize = 1;
pub const MAX_THREADS: usize = 16;

/// Default worker count: physical cores, clamped to the supported range.
pub fn auto_thread_count() -> usize {
    auto_thread_count_for_physical(num_cpus::get_physical())
}

fn auto_thread_count_for_physical(physical: usize) -> usize {
    physical.clamp(MIN_THREADS, MAX_THREADS)
}

/// Split `[0, height)` into `blocks` contiguous ranges of `height / blocks`
/// rows; the last range also takes the remainder.
pub fn row_blocks(height: usize, blocks: usize) -> Vec<Range<usize>> {
    let blocks = blocks.max(1);
    let base = height / blocks;
    (0..blocks)
        .map(|i| {
            let start = i * base;
            let end = if i + 1 == blocks { height } else { start + base };
            start..end
        })
        .collect()
}

pub struct ParallelBackend {
    pool: rayon::ThreadPool,
    thread_count: usize,
}

impl ParallelBackend {
    pub fn new(thread_count: usize) -> LifeResult<Self> {
        if !(MIN_THREADS..=MAX_THREADS).contains(&thread_count) {
            return Err(LifeError::config(format!(
                "thread count {thread_count} outside {MIN_THREADS}..={MAX_THREADS}"
            )));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("torus-life-worker-{i}"))
            .build()
            .map_err(|err| LifeError::config(format!("failed to build worker pool: {err}")))?;
        log::info!("parallel backend: {thread_count} worker threads");
        Ok(Self { pool, thread_count })
    }

    /// Backend sized by `auto_thread_count`.
    pub fn with_auto_threads() -> LifeResult<Self> {
        Self::new(auto_thread_count())
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }
}

impl Backend for ParallelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Parallel
    }

    fn compute_next(
        &mut self,
        current: &[u8],
        next: &mut [u8],
        width: usize,
        height: usize,
    ) -> LifeResult<()> {
        check_buffers(BackendKind::Parallel, current, next, width, height)?;

        let mut work: Vec<(Range<usize>, &mut [u8])> = Vec::with_capacity(self.thread_count);
        let mut rest = next;
        for rows in row_blocks(height, self.thread_count) {
            let (block, tail) = std::mem::take(&mut rest).split_at_mut(rows.len() * width);
            rest = tail;
            if !rows.is_empty() {
                work.push((rows, block));
            }
        }

        self.run_blocks(work, width, height, |rows, block| {
            fill_rows(current, width, height, rows, block);
        })
    }
}

impl ParallelBackend {
    /// Run `fill` over every block on the pool. A panicking worker fails the
    /// whole generation with `RuntimeCompute`.
    fn run_blocks<F>(
        &self,
        work: Vec<(Range<usize>, &mut [u8])>,
        width: usize,
        height: usize,
        fill: F,
    ) -> LifeResult<()>
    where
        F: Fn(Range<usize>, &mut [u8]) + Sync,
    {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                work.into_par_iter()
                    .for_each(|(rows, block)| fill(rows, block));
            })
        }));

        outcome.map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_owned())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "worker panicked".to_owned());
            LifeError::runtime(BackendKind::Parallel.name(), width, height, message)
        })
    }
}
