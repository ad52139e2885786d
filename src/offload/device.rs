//! Compute device enumeration.
//!
//! Platforms are the graphics APIs wgpu finds adapters on (Vulkan, Metal,
//! DX12, GL); devices are the adapters themselves, in enumeration order.

use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputeDevice {
    /// Index into the distinct platforms, in first-seen order.
    pub platform_id: usize,
    /// Index into the full device list.
    pub device_id: usize,
    pub platform: String,
    pub name: String,
    pub vendor: u32,
    pub device_type: DeviceKind,
    pub driver: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceKind {
    DiscreteGpu,
    IntegratedGpu,
    VirtualGpu,
    Cpu,
    Other,
}

impl From<wgpu::DeviceType> for DeviceKind {
    fn from(value: wgpu::DeviceType) -> Self {
        match value {
            wgpu::DeviceType::DiscreteGpu => DeviceKind::DiscreteGpu,
            wgpu::DeviceType::IntegratedGpu => DeviceKind::IntegratedGpu,
            wgpu::DeviceType::VirtualGpu => DeviceKind::VirtualGpu,
            wgpu::DeviceType::Cpu => DeviceKind::Cpu,
            wgpu::DeviceType::Other => DeviceKind::Other,
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "device {} (platform {} {}): {} [{:?}] vendor {:#06x}",
            self.device_id, self.platform_id, self.platform, self.name, self.device_type, self.vendor
        )?;
        if !self.driver.is_empty() {
            write!(f, " driver {}", self.driver)?;
        }
        Ok(())
    }
}

/// Adapters on `backends`, paired with their descriptions.
pub(crate) fn enumerate_adapters(
    instance: &wgpu::Instance,
    backends: wgpu::Backends,
) -> Vec<(ComputeDevice, wgpu::Adapter)> {
    let mut platforms: Vec<wgpu::Backend> = Vec::new();
    instance
        .enumerate_adapters(backends)
        .into_iter()
        .enumerate()
        .map(|(device_id, adapter)| {
            let info = adapter.get_info();
            let platform_id = match platforms.iter().position(|&b| b == info.backend) {
                Some(id) => id,
                None => {
                    platforms.push(info.backend);
                    platforms.len() - 1
                }
            };
            let device = ComputeDevice {
                platform_id,
                device_id,
                platform: format!("{:?}", info.backend),
                name: info.name,
                vendor: info.vendor,
                device_type: info.device_type.into(),
                driver: info.driver,
            };
            (device, adapter)
        })
        .collect()
}

/// Every compute device visible to wgpu on any backend.
pub fn enumerate_devices() -> Vec<ComputeDevice> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });
    enumerate_adapters(&instance, wgpu::Backends::all())
        .into_iter()
        .map(|(device, _)| device)
        .collect()
}

/// Number of distinct platforms among `devices`.
pub fn platform_count(devices: &[ComputeDevice]) -> usize {
    devices
        .iter()
        .map(|d| d.platform_id + 1)
        .max()
        .unwrap_or(0)
}

/// Default pick: the first discrete GPU, otherwise the first device.
pub fn preferred_device(devices: &[ComputeDevice]) -> Option<usize> {
    devices
        .iter()
        .position(|d| d.device_type == DeviceKind::DiscreteGpu)
        .or_else(|| (!devices.is_empty()).then_some(0))
}

#[cfg(test)]
mod tests {
    use super::{ComputeDevice, DeviceKind, platform_count, preferred_device};

    fn device(device_id: usize, platform_id: usize, kind: DeviceKind) -> ComputeDevice {
        ComputeDevice {
            platform_id,
            device_id,
            platform: "Vulkan".to_owned(),
            name: format!("dev{device_id}"),
            vendor: 0x10de,
            device_type: kind,
            driver: String::new(),
        }
    }

    #[test]
    fn prefers_first_discrete_gpu() {
        let devices = vec![
            device(0, 0, DeviceKind::IntegratedGpu),
            device(1, 0, DeviceKind::DiscreteGpu),
            device(2, 1, DeviceKind::DiscreteGpu),
        ];
        assert_eq!(preferred_device(&devices), Some(1));
        assert_eq!(platform_count(&devices), 2);
    }

    #[test]
    fn falls_back_to_first_device() {
        let devices = vec![device(0, 0, DeviceKind::Cpu), device(1, 0, DeviceKind::IntegratedGpu)];
        assert_eq!(preferred_device(&devices), Some(0));
        assert_eq!(preferred_device(&[]), None);
        assert_eq!(platform_count(&[]), 0);
    }

    #[test]
    fn display_names_platform_and_device() {
        let text = device(3, 1, DeviceKind::DiscreteGpu).to_string();
        assert!(text.starts_with("device 3 (platform 1 Vulkan): dev3"));
    }
}
