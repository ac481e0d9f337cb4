//! Physical device enumeration and compute queue selection.

use ash::vk;
use tracing::{debug, info};

use crate::error::{ComputeError, Result};

/// A physical device as seen during enumeration.
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
}

impl DeviceCandidate {
    /// Indices of the queue families advertising compute support.
    pub fn compute_families(&self) -> impl Iterator<Item = u32> + '_ {
        self.queue_families
            .iter()
            .enumerate()
            .filter(|(_, family)| family.queue_flags.contains(vk::QueueFlags::COMPUTE))
            .map(|(index, _)| index as u32)
    }
}

/// The chosen device and compute queue family. Immutable once selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub physical_device: vk::PhysicalDevice,
    pub queue_family_index: u32,
    pub name: String,
}

/// Query every physical device and its queue families.
pub fn enumerate_candidates(instance: &ash::Instance) -> Result<Vec<DeviceCandidate>> {
    let devices = unsafe { instance.enumerate_physical_devices() }
        .map_err(|e| ComputeError::DeviceCreation(format!("vkEnumeratePhysicalDevices: {e}")))?;

    let candidates = devices
        .into_iter()
        .map(|physical_device| {
            let properties = unsafe { instance.get_physical_device_properties(physical_device) };
            let queue_families =
                unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
            let name = properties
                .device_name_as_c_str()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "<unnamed device>".to_string());
            DeviceCandidate {
                physical_device,
                name,
                device_type: properties.device_type,
                queue_families,
            }
        })
        .collect();

    Ok(candidates)
}

/// Pick the first device, in enumeration order, with a compute queue family.
///
/// Enumeration order is driver-defined; when several devices qualify,
/// callers must not assume which vendor wins.
pub fn select_device(candidates: &[DeviceCandidate]) -> Result<DeviceDescriptor> {
    if candidates.is_empty() {
        return Err(ComputeError::NoSuitableDevice);
    }

    for candidate in candidates {
        debug!(
            device = %candidate.name,
            device_type = ?candidate.device_type,
            families = candidate.queue_families.len(),
            "found device"
        );
        if let Some(queue_family_index) = candidate.compute_families().next() {
            info!(device = %candidate.name, family = queue_family_index, "selected compute device");
            return Ok(DeviceDescriptor {
                physical_device: candidate.physical_device,
                queue_family_index,
                name: candidate.name.clone(),
            });
        }
    }

    Err(ComputeError::NoComputeQueue)
}
