//! The compute context: construction sequencing, dispatch and teardown.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ash::vk;
use tracing::{debug, info};

use crate::config::ComputeConfig;
use crate::device::{DeviceCandidate, DeviceDescriptor, enumerate_candidates, select_device};
use crate::dispatch::{Completed, Dispatch, DispatchTarget};
use crate::error::{ComputeError, Result};
use crate::instance::VulkanInstance;
use crate::ledger::ResourceKind;
use crate::logical::LogicalContext;
use crate::memory::{BufferTriple, read_buffer, write_buffer};
use crate::pipeline::{ComputePipeline, KernelBinary, bind_buffers, create_descriptor_pool};
use crate::validation::ValidationLog;

/// Result of one [`ComputeContext::run`].
#[derive(Debug, Clone)]
pub struct MatmulRun {
    /// `C = A × B`, row-major, `N×N`.
    pub output: Vec<f32>,
    pub dispatch: Completed,
    /// Upload + dispatch + readback.
    pub total: Duration,
}

/// A Vulkan device set up to multiply `N×N` `f32` matrices.
///
/// Construction acquires everything up front; nothing is usable until
/// [`ComputeContext::new`] returns. Dropping the context waits for the device
/// to go idle and releases every object in reverse creation order. Fields
/// drop top to bottom, so the instance goes last.
pub struct ComputeContext {
    pipeline: ComputePipeline,
    descriptor_pool: vk::DescriptorPool,
    buffers: BufferTriple,
    logical: LogicalContext,
    device: DeviceDescriptor,
    config: ComputeConfig,
    instance: VulkanInstance,
}

impl ComputeContext {
    /// Build a context for `config.matrix_size`.
    ///
    /// On failure every object created so far has already been released.
    pub fn new(config: &ComputeConfig) -> Result<Self> {
        Self::with_validation_log(config, Arc::new(ValidationLog::new()))
    }

    /// [`ComputeContext::new`], counting validation-layer messages into `log`
    /// when `config.enable_validation` is set. The log keeps counting through
    /// teardown and after a failed construction.
    pub fn with_validation_log(config: &ComputeConfig, log: Arc<ValidationLog>) -> Result<Self> {
        config.validate()?;
        info!(n = config.matrix_size, kernel = %config.kernel_path.display(), "Initializing Vulkan compute context");

        let instance = VulkanInstance::with_validation_log(config, log)?;
        let candidates = enumerate_candidates(instance.handle())?;
        let device = select_device(&candidates)?;
        let mut logical = LogicalContext::new(instance.handle(), &device)?;

        let memory_properties = *logical.memory_properties();
        let (vk_device, ledger) = logical.device_and_ledger();

        let buffers = BufferTriple::new(vk_device, &memory_properties, ledger, config.buffer_bytes())?;
        let kernel = KernelBinary::load(&config.kernel_path)?;
        let pipeline = ComputePipeline::build(vk_device, &kernel, ledger)?;
        let descriptor_pool = create_descriptor_pool(vk_device, ledger)?;

        info!(
            device = %device.name,
            n = config.matrix_size,
            resources = logical.ledger().len(),
            validation = instance.validation_enabled(),
            "Vulkan compute context ready"
        );

        Ok(Self { pipeline, descriptor_pool, buffers, logical, device, config: config.clone(), instance })
    }

    /// Multiply `a × b`. Both must be row-major with exactly `N×N` elements.
    pub fn multiply(&mut self, a: &[f32], b: &[f32]) -> Result<Vec<f32>> {
        Ok(self.run(a, b)?.output)
    }

    /// [`ComputeContext::multiply`], also reporting timings.
    pub fn run(&mut self, a: &[f32], b: &[f32]) -> Result<MatmulRun> {
        let n = self.config.matrix_size;
        let expected = self.config.element_count();
        for (name, operand) in [("A", a), ("B", b)] {
            if operand.len() != expected {
                return Err(ComputeError::InvalidDimensions(format!(
                    "operand {name} has {} elements, expected {n}×{n} = {expected}",
                    operand.len()
                )));
            }
        }

        let start = Instant::now();
        let device = self.logical.device();

        write_buffer(device, &self.buffers.a, a)?;
        write_buffer(device, &self.buffers.b, b)?;

        let descriptor_set =
            bind_buffers(device, self.descriptor_pool, self.pipeline.descriptor_set_layout, &self.buffers)?;
        let target = DispatchTarget {
            pipeline: self.pipeline.pipeline,
            pipeline_layout: self.pipeline.pipeline_layout,
            descriptor_set,
        };

        let dispatch = Dispatch::new(device, self.logical.queue(), self.logical.command_pool())?
            .record(&target, n)?
            .submit()?
            .wait()?;

        let output = read_buffer(device, &self.buffers.c, expected)?;
        let total = start.elapsed();

        info!(
            n,
            gpu_ms = dispatch.elapsed.as_secs_f64() * 1e3,
            total_ms = total.as_secs_f64() * 1e3,
            "matmul complete"
        );
        Ok(MatmulRun { output, dispatch, total })
    }

    pub fn matrix_size(&self) -> u32 {
        self.config.matrix_size
    }

    pub fn device_name(&self) -> &str {
        &self.device.name
    }

    pub fn device(&self) -> &DeviceDescriptor {
        &self.device
    }

    pub fn config(&self) -> &ComputeConfig {
        &self.config
    }

    pub fn validation_enabled(&self) -> bool {
        self.instance.validation_enabled()
    }

    pub fn validation_log(&self) -> &Arc<ValidationLog> {
        self.instance.validation_log()
    }

    /// Kinds of the device-level objects currently owned, oldest first.
    pub fn live_resources(&self) -> Vec<ResourceKind> {
        self.logical.ledger().kinds()
    }
}

impl Drop for ComputeContext {
    fn drop(&mut self) {
        debug!(device = %self.device.name, "Destroying Vulkan compute context");
    }
}

/// Enumerate the physical devices visible to the loader.
///
/// Creates and destroys a throwaway instance; the returned handles must not
/// be used afterwards.
pub fn list_devices(config: &ComputeConfig) -> Result<Vec<DeviceCandidate>> {
    let instance = VulkanInstance::new(config)?;
    enumerate_candidates(instance.handle())
}
