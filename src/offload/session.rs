//! Device session for the offload backend.
//!
//! A session walks a fixed sequence of initialization states and stops at
//! the first failing transition. Once `Ready`, each generation is
//! upload → dispatch (`Running`) → retrieve (back to `Ready`). Buffers are
//! sized for one grid; a grid of another size needs a new session.

use std::borrow::Cow;
use std::fmt;
use std::sync::mpsc;

use super::device::{ComputeDevice, enumerate_adapters, preferred_device};
use super::kernel::{ENTRY_POINT, KernelParams, LIFE_SHADER, workgroups_for};
use crate::error::{LifeError, LifeResult};

const CELL_BYTES: u64 = std::mem::size_of::<u32>() as u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Uninitialized,
    PlatformsEnumerated,
    DevicesEnumerated,
    ContextCreated,
    QueueCreated,
    BuffersAllocated,
    ProgramBuilt,
    KernelBound,
    Ready,
    Running,
    Released,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Uninitialized => "Uninitialized",
            SessionState::PlatformsEnumerated => "PlatformsEnumerated",
            SessionState::DevicesEnumerated => "DevicesEnumerated",
            SessionState::ContextCreated => "ContextCreated",
            SessionState::QueueCreated => "QueueCreated",
            SessionState::BuffersAllocated => "BuffersAllocated",
            SessionState::ProgramBuilt => "ProgramBuilt",
            SessionState::KernelBound => "KernelBound",
            SessionState::Ready => "Ready",
            SessionState::Running => "Running",
            SessionState::Released => "Released",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Records the initialization walk and names the step that failed.
struct InitProgress {
    state: SessionState,
}

impl InitProgress {
    fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
        }
    }

    fn reach(&mut self, next: SessionState) {
        debug_assert!(next > self.state);
        log::debug!("device session: {} -> {}", self.state, next);
        self.state = next;
    }

    fn fail(step: SessionState, status: impl Into<String>) -> LifeError {
        let err = LifeError::device_init(step.name(), status);
        log::error!("{err}");
        err
    }
}

/// Builder for `DeviceSession`.
#[derive(Clone, Debug)]
pub struct SessionBuilder {
    width: usize,
    height: usize,
    device_index: Option<usize>,
    backends: wgpu::Backends,
}

impl SessionBuilder {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            device_index: None,
            backends: wgpu::Backends::all(),
        }
    }

    /// Pick a device by its index in `enumerate_devices()`.
    pub fn device_index(mut self, index: usize) -> Self {
        self.device_index = Some(index);
        self
    }

    /// Restrict the platforms searched for devices.
    pub fn backends(mut self, backends: wgpu::Backends) -> Self {
        self.backends = backends;
        self
    }

    pub fn build(self) -> LifeResult<DeviceSession> {
        pollster::block_on(self.build_async())
    }

    async fn build_async(self) -> LifeResult<DeviceSession> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Err(LifeError::config(format!(
                "device session needs a non-empty grid, got {width}x{height}"
            )));
        }
        let cells = width
            .checked_mul(height)
            .filter(|&n| u32::try_from(n).is_ok())
            .ok_or_else(|| {
                LifeError::config(format!("grid {width}x{height} exceeds the device index range"))
            })?;

        let mut progress = InitProgress::new();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: self.backends,
            ..Default::default()
        });
        let mut adapters = enumerate_adapters(&instance, self.backends);
        if adapters.is_empty() {
            return Err(InitProgress::fail(
                SessionState::PlatformsEnumerated,
                "no compute platforms detected",
            ));
        }
        progress.reach(SessionState::PlatformsEnumerated);

        let descriptions: Vec<ComputeDevice> = adapters.iter().map(|(d, _)| d.clone()).collect();
        let chosen = match self.device_index {
            Some(index) if index < adapters.len() => index,
            Some(index) => {
                return Err(InitProgress::fail(
                    SessionState::DevicesEnumerated,
                    format!("device index {index} out of range ({} devices)", adapters.len()),
                ));
            }
            None => preferred_device(&descriptions).ok_or_else(|| {
                InitProgress::fail(SessionState::DevicesEnumerated, "no devices detected")
            })?,
        };
        let (device_info, adapter) = adapters.swap_remove(chosen);
        log::info!("offload device selected: {device_info}");
        progress.reach(SessionState::DevicesEnumerated);

        let limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("torus-life device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                },
                None,
            )
            .await
            .map_err(|err| InitProgress::fail(SessionState::ContextCreated, err.to_string()))?;
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            log::error!("uncaptured device error: {err}");
        }));
        progress.reach(SessionState::ContextCreated);
        progress.reach(SessionState::QueueCreated);

        let buffer_bytes = cells as u64 * CELL_BYTES;
        if buffer_bytes > limits.max_buffer_size
            || buffer_bytes > u64::from(limits.max_storage_buffer_binding_size)
        {
            return Err(InitProgress::fail(
                SessionState::BuffersAllocated,
                format!(
                    "{buffer_bytes} byte cell buffer exceeds device limits (buffer {}, binding {})",
                    limits.max_buffer_size, limits.max_storage_buffer_binding_size
                ),
            ));
        }
        let (groups_x, groups_y) = (workgroups_for(width as u32), workgroups_for(height as u32));
        if groups_x > limits.max_compute_workgroups_per_dimension
            || groups_y > limits.max_compute_workgroups_per_dimension
        {
            return Err(InitProgress::fail(
                SessionState::BuffersAllocated,
                format!(
                    "{groups_x}x{groups_y} workgroups exceed the per-dimension limit {}",
                    limits.max_compute_workgroups_per_dimension
                ),
            ));
        }

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let params = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("life params"),
            size: std::mem::size_of::<KernelParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let input = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("life cells in"),
            size: buffer_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let output = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("life cells out"),
            size: buffer_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("life staging"),
            size: buffer_bytes,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(InitProgress::fail(SessionState::BuffersAllocated, err.to_string()));
        }
        queue.write_buffer(
            &params,
            0,
            bytemuck::bytes_of(&KernelParams::new(width as u32, height as u32)),
        );
        progress.reach(SessionState::BuffersAllocated);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("life shader"),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(LIFE_SHADER)),
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(InitProgress::fail(SessionState::ProgramBuilt, err.to_string()));
        }
        progress.reach(SessionState::ProgramBuilt);

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let storage_entry = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("life bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                storage_entry(1, true),
                storage_entry(2, false),
            ],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("life bind group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: output.as_entire_binding(),
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("life pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("life pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: ENTRY_POINT,
            compilation_options: Default::default(),
        });
        if let Some(err) = device.pop_error_scope().await {
            return Err(InitProgress::fail(SessionState::KernelBound, err.to_string()));
        }
        progress.reach(SessionState::KernelBound);
        progress.reach(SessionState::Ready);

        log::info!(
            "device session ready: {width}x{height} grid, {groups_x}x{groups_y} workgroups"
        );

        Ok(DeviceSession {
            state: progress.state,
            width,
            height,
            device_info,
            device,
            queue,
            params,
            input,
            output,
            staging,
            pipeline,
            bind_group,
            upload_scratch: Vec::with_capacity(cells),
        })
    }
}

pub struct DeviceSession {
    state: SessionState,
    width: usize,
    height: usize,
    device_info: ComputeDevice,
    device: wgpu::Device,
    queue: wgpu::Queue,
    params: wgpu::Buffer,
    input: wgpu::Buffer,
    output: wgpu::Buffer,
    staging: wgpu::Buffer,
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
    upload_scratch: Vec<u32>,
}

impl DeviceSession {
    pub fn builder(width: usize, height: usize) -> SessionBuilder {
        SessionBuilder::new(width, height)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn device_info(&self) -> &ComputeDevice {
        &self.device_info
    }

    fn cell_count(&self) -> usize {
        self.width * self.height
    }

    fn require(&self, expected: SessionState, operation: &str) -> LifeResult<()> {
        if self.state != expected {
            return Err(LifeError::config(format!(
                "{operation} requires a {expected} session, session is {}",
                self.state
            )));
        }
        Ok(())
    }

    fn runtime_error(&self, message: impl Into<String>) -> LifeError {
        LifeError::runtime("offload", self.width, self.height, message)
    }

    /// Fail unless this session was built for a `width x height` grid.
    pub fn check_dimensions(&self, width: usize, height: usize) -> LifeResult<()> {
        if (width, height) != (self.width, self.height) {
            return Err(LifeError::config(format!(
                "device session is bound to a {}x{} grid, got {width}x{height}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    /// Copy host cells into the device input buffer.
    pub fn upload(&mut self, cells: &[u8]) -> LifeResult<()> {
        self.require(SessionState::Ready, "upload")?;
        if cells.len() != self.cell_count() {
            return Err(self.runtime_error(format!(
                "upload of {} cells into a {} cell buffer",
                cells.len(),
                self.cell_count()
            )));
        }
        self.upload_scratch.clear();
        self.upload_scratch
            .extend(cells.iter().map(|&c| u32::from(c != 0)));
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        self.queue
            .write_buffer(&self.input, 0, bytemuck::cast_slice::<u32, u8>(&self.upload_scratch));
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(self.runtime_error(format!("upload rejected: {err}")));
        }
        Ok(())
    }

    /// Enqueue one generation. Returns once submitted, not once complete.
    pub fn dispatch(&mut self) -> LifeResult<()> {
        self.require(SessionState::Ready, "dispatch")?;
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("life generation"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("life pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(
                workgroups_for(self.width as u32),
                workgroups_for(self.height as u32),
                1,
            );
        }
        self.queue.submit(Some(encoder.finish()));
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(self.runtime_error(format!("kernel dispatch rejected: {err}")));
        }
        self.state = SessionState::Running;
        Ok(())
    }

    /// Wait for the dispatched generation and copy it into `out`.
    pub fn retrieve(&mut self, out: &mut [u8]) -> LifeResult<()> {
        self.require(SessionState::Running, "retrieve")?;
        // The submitted work is finished or abandoned either way after this call.
        self.state = SessionState::Ready;
        if out.len() != self.cell_count() {
            return Err(self.runtime_error(format!(
                "retrieval of {} cells into a {} cell buffer",
                self.cell_count(),
                out.len()
            )));
        }

        let bytes = self.cell_count() as u64 * CELL_BYTES;
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("life readback"),
            });
        encoder.copy_buffer_to_buffer(&self.output, 0, &self.staging, 0, bytes);
        let commands = encoder.finish();
        // A rejected copy is never submitted.
        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(self.runtime_error(format!("readback copy rejected: {err}")));
        }
        self.queue.submit(Some(commands));

        let slice = self.staging.slice(..bytes);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(self.runtime_error(format!("readback failed: {err}"))),
            Err(_) => return Err(self.runtime_error("readback callback never ran")),
        }

        {
            let data = slice.get_mapped_range();
            for (cell, word) in out.iter_mut().zip(data.chunks_exact(CELL_BYTES as usize)) {
                *cell = u8::from(word.iter().any(|&b| b != 0));
            }
        }
        self.staging.unmap();
        Ok(())
    }

    /// Free device buffers. Any later use is a configuration error.
    pub fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        self.params.destroy();
        self.input.destroy();
        self.output.destroy();
        self.staging.destroy();
        self.state = SessionState::Released;
        log::info!("device session released ({})", self.device_info.name);
    }
}

#[cfg(test)]
mod tests {
    use super::{DeviceSession, SessionState};
    use crate::error::LifeError;

    fn session(width: usize, height: usize) -> Option<DeviceSession> {
        match DeviceSession::builder(width, height).build() {
            Ok(session) => Some(session),
            Err(err) => {
                eprintln!("skipping device test: {err}");
                None
            }
        }
    }

    #[test]
    fn states_are_ordered_along_the_init_walk() {
        let walk = [
            SessionState::Uninitialized,
            SessionState::PlatformsEnumerated,
            SessionState::DevicesEnumerated,
            SessionState::ContextCreated,
            SessionState::QueueCreated,
            SessionState::BuffersAllocated,
            SessionState::ProgramBuilt,
            SessionState::KernelBound,
            SessionState::Ready,
        ];
        assert!(walk.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(SessionState::KernelBound.to_string(), "KernelBound");
    }

    #[test]
    fn upload_into_destroyed_buffer_is_a_runtime_error() {
        let Some(mut session) = session(4, 4) else {
            return;
        };
        session.input.destroy();
        let err = session.upload(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, LifeError::RuntimeCompute { backend: "offload", .. }));
    }

    #[test]
    fn failed_readback_copy_is_not_reported_as_success() {
        let Some(mut session) = session(4, 4) else {
            return;
        };
        session.upload(&[1u8; 16]).unwrap();
        session.dispatch().unwrap();
        session.staging.destroy();
        let mut out = [7u8; 16];
        let err = session.retrieve(&mut out).unwrap_err();
        assert!(matches!(err, LifeError::RuntimeCompute { .. }));
        assert_eq!(out, [7u8; 16]);
        assert_eq!(session.state(), SessionState::Ready);
    }
}
