//! GPU offload backend built on wgpu compute.

pub mod device;
pub mod kernel;
mod session;

pub use device::{ComputeDevice, DeviceKind, enumerate_devices, platform_count, preferred_device};
pub use session::{DeviceSession, SessionBuilder, SessionState};

use crate::backend::{Backend, BackendKind, check_buffers};
use crate::error::LifeResult;

/// Runs each generation as one 2D kernel dispatch followed by an explicit
/// readback into the host `next` buffer.
pub struct OffloadBackend {
    session: DeviceSession,
}

impl OffloadBackend {
    pub fn new(session: DeviceSession) -> Self {
        Self { session }
    }

    /// Build a session for a `width x height` grid on the preferred device,
    /// or on `device_index` when given.
    pub fn for_grid(width: usize, height: usize, device_index: Option<usize>) -> LifeResult<Self> {
        let mut builder = DeviceSession::builder(width, height);
        if let Some(index) = device_index {
            builder = builder.device_index(index);
        }
        Ok(Self::new(builder.build()?))
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }
}

impl Backend for OffloadBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Offload
    }

    fn compute_next(
        &mut self,
        current: &[u8],
        next: &mut [u8],
        width: usize,
        height: usize,
    ) -> LifeResult<()> {
        self.session.check_dimensions(width, height)?;
        check_buffers(BackendKind::Offload, current, next, width, height)?;
        self.session.upload(current)?;
        self.session.dispatch()?;
        self.session.retrieve(next)
    }

    fn release(&mut self) {
        self.session.release();
    }
}
