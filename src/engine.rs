use crate::backend::{Backend, BackendKind, ParallelBackend, SequentialBackend};
use crate::error::LifeResult;
use crate::grid::{DEAD, Grid};

/// Configuration for a TorusLife engine instance.
///
/// `TorusLifeConfig::default()` runs the sequential backend. Knobs that do
/// not apply to the selected backend are ignored.
#[derive(Clone, Debug, Default)]
pub struct TorusLifeConfig {
    /// Backend selection. `None` means sequential.
    pub backend: Option<BackendKind>,
    /// Worker threads for the parallel backend, 1..=16.
    /// `None` means physical cores, clamped to that range.
    pub thread_count: Option<usize>,
    /// Device index for the offload backend, as listed by
    /// `offload::enumerate_devices`. `None` picks the first discrete GPU.
    pub device_index: Option<usize>,
}

impl TorusLifeConfig {
    pub fn backend(mut self, kind: BackendKind) -> Self {
        self.backend = Some(kind);
        self
    }

    /// Set an explicit worker count. Validated when the engine is built.
    pub fn thread_count(mut self, n: usize) -> Self {
        self.thread_count = Some(n);
        self
    }

    pub fn device_index(mut self, index: usize) -> Self {
        self.device_index = Some(index);
        self
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.unwrap_or(BackendKind::Sequential)
    }
}

/// Build the backend named by `config`, sized for `grid` where needed.
pub fn build_backend(config: &TorusLifeConfig, grid: &Grid) -> LifeResult<Box<dyn Backend>> {
    match config.backend_kind() {
        BackendKind::Sequential => Ok(Box::new(SequentialBackend::new())),
        BackendKind::Parallel => {
            let backend = match config.thread_count {
                Some(n) => ParallelBackend::new(n)?,
                None => ParallelBackend::with_auto_threads()?,
            };
            Ok(Box::new(backend))
        }
        BackendKind::Offload => build_offload(config, grid),
    }
}

#[cfg(feature = "offload")]
fn build_offload(config: &TorusLifeConfig, grid: &Grid) -> LifeResult<Box<dyn Backend>> {
    let backend =
        crate::offload::OffloadBackend::for_grid(grid.width(), grid.height(), config.device_index)?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "offload"))]
fn build_offload(_config: &TorusLifeConfig, _grid: &Grid) -> LifeResult<Box<dyn Backend>> {
    Err(crate::error::LifeError::config(
        "offload backend unavailable: built without the `offload` feature",
    ))
}

/// Owns the engine's backend and releases it when dropped, so a run that
/// aborts part way still frees device and thread resources.
struct BackendHandle(Box<dyn Backend>);

impl Drop for BackendHandle {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// A grid plus the backend that advances it.
pub struct TorusLife {
    grid: Grid,
    backend: BackendHandle,
    generation: u64,
}

impl TorusLife {
    /// Sequential engine over `grid`.
    pub fn new(grid: Grid) -> Self {
        Self::with_backend(grid, Box::new(SequentialBackend::new()))
    }

    pub fn with_config(grid: Grid, config: TorusLifeConfig) -> LifeResult<Self> {
        let backend = build_backend(&config, &grid)?;
        Ok(Self::with_backend(grid, backend))
    }

    pub fn with_backend(grid: Grid, backend: Box<dyn Backend>) -> Self {
        log::info!(
            "engine: {}x{} grid, {} backend",
            grid.width(),
            grid.height(),
            backend.kind()
        );
        Self {
            grid,
            backend: BackendHandle(backend),
            generation: 0,
        }
    }

    /// Advance one generation. On failure the grid keeps its current
    /// generation and the error carries the backend and grid size.
    pub fn step(&mut self) -> LifeResult<()> {
        self.backend.0.advance(&mut self.grid)?;
        self.generation += 1;
        log::trace!("generation {} complete", self.generation);
        Ok(())
    }

    /// Advance `n` generations, stopping at the first failure.
    pub fn step_n(&mut self, n: u64) -> LifeResult<()> {
        for _ in 0..n {
            self.step().inspect_err(|err| {
                log::error!("run aborted at generation {}: {err}", self.generation + 1);
            })?;
        }
        log::debug!(
            "advanced {n} generations with {} backend (now at {})",
            self.backend.0.kind(),
            self.generation
        );
        Ok(())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> u64 {
        self.grid.population()
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.0.kind()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn get_cell(&self, x: usize, y: usize) -> bool {
        self.grid.is_alive(x, y)
    }

    pub fn for_each_live<F: FnMut(usize, usize)>(&self, mut f: F) {
        let width = self.grid.width();
        for (idx, _) in self
            .grid
            .current()
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != DEAD)
        {
            f(idx % width, idx / width);
        }
    }

    /// Release backend resources and hand back the grid.
    pub fn into_grid(self) -> Grid {
        self.grid
    }
}
