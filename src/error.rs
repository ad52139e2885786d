//! Error type shared by the grid, the backends and the snapshot layer.

use std::path::PathBuf;
use thiserror::Error;

pub type LifeResult<T> = Result<T, LifeError>;

#[derive(Error, Debug)]
pub enum LifeError {
    /// Snapshot header or row could not be parsed. `line` is 1-based.
    #[error("malformed input at line {line}: {message}")]
    MalformedInput { line: usize, message: String },

    /// Invalid thread count, mismatched session size, unavailable backend.
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// A device session step failed; `step` names the transition being attempted.
    #[error("device initialization failed at {step}: {status}")]
    DeviceInitialization { step: &'static str, status: String },

    /// A worker or kernel failed mid-generation. The generation was discarded.
    #[error("{backend} backend failed on {width}x{height} grid: {message}")]
    RuntimeCompute {
        backend: &'static str,
        width: usize,
        height: usize,
        message: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LifeError {
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedInput {
            line,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn device_init(step: &'static str, status: impl Into<String>) -> Self {
        Self::DeviceInitialization {
            step,
            status: status.into(),
        }
    }

    pub fn runtime(
        backend: &'static str,
        width: usize,
        height: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::RuntimeCompute {
            backend,
            width,
            height,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the error kinds raised before any generation runs.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedInput { .. } | Self::Configuration { .. } | Self::DeviceInitialization { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::LifeError;

    #[test]
    fn messages_carry_context() {
        let err = LifeError::device_init("ProgramBuilt", "shader validation failed");
        assert_eq!(
            err.to_string(),
            "device initialization failed at ProgramBuilt: shader validation failed"
        );

        let err = LifeError::runtime("parallel", 64, 32, "worker panicked");
        assert_eq!(
            err.to_string(),
            "parallel backend failed on 64x32 grid: worker panicked"
        );
        assert!(!err.is_setup_error());
        assert!(LifeError::config("bad").is_setup_error());
    }
}
