//! Logical device, compute queue and command pool.

use ash::vk;
use tracing::{debug, warn};

use crate::device::DeviceDescriptor;
use crate::error::{ComputeError, Result};
use crate::ledger::{ResourceLedger, TrackedResource};

/// Owns the logical device and every device-level object created from it.
///
/// Dropping it waits for the device to go idle, releases the ledger newest
/// first (the command pool is its oldest entry), then destroys the device.
pub struct LogicalContext {
    device: ash::Device,
    queue: vk::Queue,
    queue_family_index: u32,
    command_pool: vk::CommandPool,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    ledger: ResourceLedger,
}

impl LogicalContext {
    pub fn new(instance: &ash::Instance, descriptor: &DeviceDescriptor) -> Result<Self> {
        debug!(family = descriptor.queue_family_index, "Creating logical device");

        let priorities = [1.0f32];
        let queue_info = vk::DeviceQueueCreateInfo::default()
            .queue_family_index(descriptor.queue_family_index)
            .queue_priorities(&priorities);
        let features = vk::PhysicalDeviceFeatures::default();
        let device_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(std::slice::from_ref(&queue_info))
            .enabled_features(&features);

        let device = unsafe { instance.create_device(descriptor.physical_device, &device_info, None) }
            .map_err(|e| ComputeError::DeviceCreation(format!("vkCreateDevice: {e}")))?;
        let queue = unsafe { device.get_device_queue(descriptor.queue_family_index, 0) };

        debug!("Creating command pool");
        let pool_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(descriptor.queue_family_index)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(ComputeError::DeviceCreation(format!("vkCreateCommandPool: {e}")));
            }
        };

        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(descriptor.physical_device) };

        let mut ledger = ResourceLedger::new();
        ledger.track(TrackedResource::CommandPool(command_pool));

        debug!("Logical device created");
        Ok(Self {
            device,
            queue,
            queue_family_index: descriptor.queue_family_index,
            command_pool,
            memory_properties,
            ledger,
        })
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    /// Live objects owned by this context, oldest first.
    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Split borrow for builders that create and track objects.
    pub(crate) fn device_and_ledger(&mut self) -> (&ash::Device, &mut ResourceLedger) {
        (&self.device, &mut self.ledger)
    }
}

impl Drop for LogicalContext {
    fn drop(&mut self) {
        debug!(live = self.ledger.len(), "Releasing logical device resources");
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                warn!(error = %e, "vkDeviceWaitIdle failed during teardown");
            }
            self.ledger.release_all(&self.device);
            self.device.destroy_device(None);
        }
        debug!("Logical device destroyed");
    }
}
