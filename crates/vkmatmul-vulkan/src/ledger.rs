//! Creation-ordered record of device-level Vulkan objects.
//!
//! Every handle is pushed onto the [`ResourceLedger`] the moment the driver
//! returns it, and [`ResourceLedger::release_all`] pops them back off. The
//! result is strict reverse-of-creation teardown on every path, including a
//! construction that fails halfway through.
//!
//! Destruction goes through the [`Release`] trait. `ash::Device` is the real
//! implementation; tests substitute a recorder to check ordering and leaks
//! without a GPU.

use std::fmt;

use ash::vk;
use tracing::{debug, warn};

/// Kind of a tracked object, for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    CommandPool,
    Buffer,
    Memory,
    DescriptorSetLayout,
    ShaderModule,
    PipelineLayout,
    Pipeline,
    DescriptorPool,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CommandPool => "command pool",
            Self::Buffer => "buffer",
            Self::Memory => "device memory",
            Self::DescriptorSetLayout => "descriptor set layout",
            Self::ShaderModule => "shader module",
            Self::PipelineLayout => "pipeline layout",
            Self::Pipeline => "pipeline",
            Self::DescriptorPool => "descriptor pool",
        };
        f.write_str(name)
    }
}

/// A device-level object owned by a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedResource {
    CommandPool(vk::CommandPool),
    Buffer(vk::Buffer),
    Memory(vk::DeviceMemory),
    DescriptorSetLayout(vk::DescriptorSetLayout),
    ShaderModule(vk::ShaderModule),
    PipelineLayout(vk::PipelineLayout),
    Pipeline(vk::Pipeline),
    DescriptorPool(vk::DescriptorPool),
}

impl TrackedResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::CommandPool(_) => ResourceKind::CommandPool,
            Self::Buffer(_) => ResourceKind::Buffer,
            Self::Memory(_) => ResourceKind::Memory,
            Self::DescriptorSetLayout(_) => ResourceKind::DescriptorSetLayout,
            Self::ShaderModule(_) => ResourceKind::ShaderModule,
            Self::PipelineLayout(_) => ResourceKind::PipelineLayout,
            Self::Pipeline(_) => ResourceKind::Pipeline,
            Self::DescriptorPool(_) => ResourceKind::DescriptorPool,
        }
    }
}

/// Destroys a single tracked object.
pub trait Release {
    /// # Safety
    /// `resource` must have been created by this releaser, must not be in use
    /// by the device, and must not be released twice.
    unsafe fn release(&self, resource: TrackedResource);
}

impl Release for ash::Device {
    unsafe fn release(&self, resource: TrackedResource) {
        unsafe {
            match resource {
                TrackedResource::CommandPool(h) => self.destroy_command_pool(h, None),
                TrackedResource::Buffer(h) => self.destroy_buffer(h, None),
                TrackedResource::Memory(h) => self.free_memory(h, None),
                TrackedResource::DescriptorSetLayout(h) => self.destroy_descriptor_set_layout(h, None),
                TrackedResource::ShaderModule(h) => self.destroy_shader_module(h, None),
                TrackedResource::PipelineLayout(h) => self.destroy_pipeline_layout(h, None),
                TrackedResource::Pipeline(h) => self.destroy_pipeline(h, None),
                // Destroying the pool frees every set allocated from it.
                TrackedResource::DescriptorPool(h) => self.destroy_descriptor_pool(h, None),
            }
        }
    }
}

/// Stack of live objects in creation order.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    entries: Vec<TrackedResource>,
}

impl ResourceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a freshly created object.
    pub fn track(&mut self, resource: TrackedResource) {
        debug!(kind = %resource.kind(), position = self.entries.len(), "tracking resource");
        self.entries.push(resource);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Kinds of the live objects, oldest first.
    pub fn kinds(&self) -> Vec<ResourceKind> {
        self.entries.iter().map(TrackedResource::kind).collect()
    }

    /// Release every object, newest first. The ledger is empty afterwards.
    ///
    /// # Safety
    /// All tracked objects must belong to `releaser` and be idle on the device.
    pub unsafe fn release_all<R: Release + ?Sized>(&mut self, releaser: &R) {
        while let Some(resource) = self.entries.pop() {
            debug!(kind = %resource.kind(), "releasing resource");
            unsafe { releaser.release(resource) };
        }
    }
}

impl Drop for ResourceLedger {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            // Without a device there is nothing left to destroy them with.
            warn!(count = self.entries.len(), "resource ledger dropped with live objects");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        released: RefCell<Vec<TrackedResource>>,
    }

    impl Release for Recorder {
        unsafe fn release(&self, resource: TrackedResource) {
            self.released.borrow_mut().push(resource);
        }
    }

    fn context_shaped_ledger() -> ResourceLedger {
        let mut ledger = ResourceLedger::new();
        ledger.track(TrackedResource::CommandPool(vk::CommandPool::from_raw(1)));
        for i in 0..3 {
            ledger.track(TrackedResource::Buffer(vk::Buffer::from_raw(10 + i)));
            ledger.track(TrackedResource::Memory(vk::DeviceMemory::from_raw(20 + i)));
        }
        ledger.track(TrackedResource::DescriptorSetLayout(vk::DescriptorSetLayout::from_raw(30)));
        ledger.track(TrackedResource::ShaderModule(vk::ShaderModule::from_raw(31)));
        ledger.track(TrackedResource::PipelineLayout(vk::PipelineLayout::from_raw(32)));
        ledger.track(TrackedResource::Pipeline(vk::Pipeline::from_raw(33)));
        ledger.track(TrackedResource::DescriptorPool(vk::DescriptorPool::from_raw(34)));
        ledger
    }

    #[test]
    fn releases_in_reverse_creation_order() {
        let mut ledger = context_shaped_ledger();
        let created = ledger.entries.clone();
        let recorder = Recorder::default();

        unsafe { ledger.release_all(&recorder) };

        let mut expected = created;
        expected.reverse();
        assert_eq!(*recorder.released.borrow(), expected);
        assert!(ledger.is_empty());
    }

    #[test]
    fn teardown_kind_sequence() {
        let mut ledger = context_shaped_ledger();
        let recorder = Recorder::default();
        unsafe { ledger.release_all(&recorder) };

        let kinds: Vec<ResourceKind> = recorder.released.borrow().iter().map(TrackedResource::kind).collect();
        assert_eq!(kinds.first(), Some(&ResourceKind::DescriptorPool));
        assert_eq!(kinds[1..5], [
            ResourceKind::Pipeline,
            ResourceKind::PipelineLayout,
            ResourceKind::ShaderModule,
            ResourceKind::DescriptorSetLayout,
        ]);
        assert_eq!(kinds.last(), Some(&ResourceKind::CommandPool));
    }

    #[test]
    fn partial_construction_releases_only_what_exists() {
        let mut ledger = ResourceLedger::new();
        ledger.track(TrackedResource::CommandPool(vk::CommandPool::from_raw(1)));
        ledger.track(TrackedResource::Buffer(vk::Buffer::from_raw(2)));
        // Memory allocation "failed" here.
        let recorder = Recorder::default();
        unsafe { ledger.release_all(&recorder) };
        assert_eq!(*recorder.released.borrow(), vec![
            TrackedResource::Buffer(vk::Buffer::from_raw(2)),
            TrackedResource::CommandPool(vk::CommandPool::from_raw(1)),
        ]);
    }

    #[test]
    fn repeated_ledgers_release_everything_tracked() {
        let recorder = Recorder::default();
        let mut created = 0usize;
        for _ in 0..100 {
            let mut ledger = context_shaped_ledger();
            created += ledger.len();
            unsafe { ledger.release_all(&recorder) };
            assert!(ledger.is_empty());
        }
        assert_eq!(recorder.released.borrow().len(), created);
    }

    #[test]
    fn release_all_is_idempotent() {
        let mut ledger = context_shaped_ledger();
        let recorder = Recorder::default();
        unsafe {
            ledger.release_all(&recorder);
            ledger.release_all(&recorder);
        }
        assert_eq!(recorder.released.borrow().len(), 12);
    }

    #[test]
    fn kind_display() {
        assert_eq!(ResourceKind::DescriptorSetLayout.to_string(), "descriptor set layout");
        assert_eq!(ResourceKind::Memory.to_string(), "device memory");
    }
}
