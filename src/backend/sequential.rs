//! Single-threaded reference backend.

use super::{Backend, BackendKind, check_buffers, fill_rows};
use crate::error::LifeResult;

#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialBackend;

impl SequentialBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for SequentialBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sequential
    }

    fn compute_next(
        &mut self,
        current: &[u8],
        next: &mut [u8],
        width: usize,
        height: usize,
    ) -> LifeResult<()> {
        check_buffers(BackendKind::Sequential, current, next, width, height)?;
        fill_rows(current, width, height, 0..height, next);
        Ok(())
    }
}
