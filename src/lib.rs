//! Conway's Game of Life (B3/S23) on a fixed-size torus with interchangeable
//! sequential, multi-threaded and GPU-offload backends.

pub mod backend;
pub mod engine;
pub mod error;
pub mod grid;
#[cfg(feature = "offload")]
pub mod offload;
pub mod rules;
pub mod snapshot;

pub use backend::{Backend, BackendKind, ParallelBackend, SequentialBackend};
pub use engine::{TorusLife, TorusLifeConfig};
pub use error::{LifeError, LifeResult};
pub use grid::{CellState, Grid};
#[cfg(feature = "offload")]
pub use offload::OffloadBackend;
