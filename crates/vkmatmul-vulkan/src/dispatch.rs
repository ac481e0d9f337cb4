//! Single-dispatch executor and workgroup sizing.
//!
//! A dispatch moves through `Idle → Recorded → Submitted` as a typestate;
//! [`Dispatch::wait`] consumes the last state and yields a [`Completed`]
//! outcome. Out-of-order calls do not compile. The command buffer and fence
//! belong to the dispatch and are freed when it is dropped, on success and
//! on every failure path.

use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};

use ash::vk;
use tracing::{debug, warn};

use crate::error::{ComputeError, Result};
use crate::kernels::{KernelContract, MatmulPushConstants};

/// Configuration for a single compute dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Workgroup size declared in the shader (x, y, z).
    pub workgroup_size: [u32; 3],
    /// Number of workgroups to dispatch (x, y, z).
    pub dispatch_size: [u32; 3],
}

impl DispatchConfig {
    /// Square 2-D dispatch covering an `n×n` output with `workgroup_size²` tiles.
    pub fn for_matrix(n: u32, workgroup_size: u32) -> Self {
        let groups = compute_dispatch_size(n, workgroup_size);
        Self { workgroup_size: [workgroup_size, workgroup_size, 1], dispatch_size: [groups, groups, 1] }
    }

    /// Dispatch for the bundled kernel, whose `local_size` is
    /// [`KernelContract::WORKGROUP_SIZE`] in X and Y.
    pub fn for_kernel(n: u32) -> Self {
        Self::for_matrix(n, KernelContract::WORKGROUP_SIZE)
    }

    /// Total number of invocations launched across all workgroups.
    pub fn total_threads(&self) -> u64 {
        let wg: u64 = self.workgroup_size.iter().map(|&v| v as u64).product();
        let ds: u64 = self.dispatch_size.iter().map(|&v| v as u64).product();
        wg * ds
    }
}

impl fmt::Display for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workgroup[{}×{}×{}] dispatch[{}×{}×{}]",
            self.workgroup_size[0],
            self.workgroup_size[1],
            self.workgroup_size[2],
            self.dispatch_size[0],
            self.dispatch_size[1],
            self.dispatch_size[2],
        )
    }
}

/// Number of workgroups needed to cover `total_elements`, rounding up.
///
/// # Panics
/// If `workgroup_size` is zero.
pub fn compute_dispatch_size(total_elements: u32, workgroup_size: u32) -> u32 {
    assert!(workgroup_size > 0, "workgroup_size must be > 0");
    total_elements.div_ceil(workgroup_size)
}

/// Pipeline objects a dispatch binds.
#[derive(Debug, Clone, Copy)]
pub struct DispatchTarget {
    pub pipeline: vk::Pipeline,
    pub pipeline_layout: vk::PipelineLayout,
    pub descriptor_set: vk::DescriptorSet,
}

/// Command buffer allocated, nothing recorded.
pub struct Idle;
/// Commands recorded, not yet submitted.
pub struct Recorded;
/// Submitted to the queue; the fence will signal on completion.
pub struct Submitted;

/// A finished dispatch.
#[derive(Debug, Clone, Copy)]
pub struct Completed {
    pub config: DispatchConfig,
    /// Submit-to-signal wall time.
    pub elapsed: Duration,
}

struct DispatchResources<'a> {
    device: &'a ash::Device,
    queue: vk::Queue,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    fence: Option<vk::Fence>,
    in_flight: bool,
}

impl Drop for DispatchResources<'_> {
    fn drop(&mut self) {
        unsafe {
            if self.in_flight {
                // The fence wait failed; the buffer may still be executing.
                if let Err(e) = self.device.queue_wait_idle(self.queue) {
                    warn!(error = %e, "vkQueueWaitIdle failed while abandoning dispatch");
                }
            }
            if let Some(fence) = self.fence.take() {
                self.device.destroy_fence(fence, None);
            }
            self.device.free_command_buffers(self.command_pool, &[self.command_buffer]);
        }
        debug!("released dispatch command buffer");
    }
}

/// One matmul dispatch in state `S`.
pub struct Dispatch<'a, S> {
    resources: DispatchResources<'a>,
    config: Option<DispatchConfig>,
    submitted_at: Option<Instant>,
    _state: PhantomData<S>,
}

impl<'a, S> Dispatch<'a, S> {
    fn into_state<T>(self) -> Dispatch<'a, T> {
        Dispatch {
            resources: self.resources,
            config: self.config,
            submitted_at: self.submitted_at,
            _state: PhantomData,
        }
    }

    /// Dispatch geometry, once recorded.
    pub fn config(&self) -> Option<DispatchConfig> {
        self.config
    }
}

impl<'a> Dispatch<'a, Idle> {
    /// Allocate a primary command buffer from `command_pool`.
    pub fn new(device: &'a ash::Device, queue: vk::Queue, command_pool: vk::CommandPool) -> Result<Self> {
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffer = unsafe { device.allocate_command_buffers(&alloc_info) }
            .map_err(|e| ComputeError::Dispatch(format!("vkAllocateCommandBuffers: {e}")))?
            .into_iter()
            .next()
            .ok_or_else(|| ComputeError::Dispatch("vkAllocateCommandBuffers returned no buffer".into()))?;

        Ok(Self {
            resources: DispatchResources {
                device,
                queue,
                command_pool,
                command_buffer,
                fence: None,
                in_flight: false,
            },
            config: None,
            submitted_at: None,
            _state: PhantomData,
        })
    }

    /// Record bind, push-constant and dispatch commands for an `n×n` multiply.
    pub fn record(mut self, target: &DispatchTarget, n: u32) -> Result<Dispatch<'a, Recorded>> {
        if n == 0 {
            return Err(ComputeError::InvalidDimensions("matrix dimension must be > 0".into()));
        }
        let config = DispatchConfig::for_kernel(n);
        let push = MatmulPushConstants { n };
        let device = self.resources.device;
        let cb = self.resources.command_buffer;

        let begin = vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe {
            device
                .begin_command_buffer(cb, &begin)
                .map_err(|e| ComputeError::Dispatch(format!("vkBeginCommandBuffer: {e}")))?;
            device.cmd_bind_pipeline(cb, vk::PipelineBindPoint::COMPUTE, target.pipeline);
            device.cmd_bind_descriptor_sets(
                cb,
                vk::PipelineBindPoint::COMPUTE,
                target.pipeline_layout,
                0,
                &[target.descriptor_set],
                &[],
            );
            device.cmd_push_constants(
                cb,
                target.pipeline_layout,
                vk::ShaderStageFlags::COMPUTE,
                0,
                bytemuck::bytes_of(&push),
            );
            device.cmd_dispatch(cb, config.dispatch_size[0], config.dispatch_size[1], config.dispatch_size[2]);
            device
                .end_command_buffer(cb)
                .map_err(|e| ComputeError::Dispatch(format!("vkEndCommandBuffer: {e}")))?;
        }

        debug!(n, %config, "recorded dispatch");
        self.config = Some(config);
        Ok(self.into_state())
    }
}

impl<'a> Dispatch<'a, Recorded> {
    /// Submit to the compute queue, signalling a fresh fence.
    pub fn submit(mut self) -> Result<Dispatch<'a, Submitted>> {
        let device = self.resources.device;
        let fence = unsafe { device.create_fence(&vk::FenceCreateInfo::default(), None) }
            .map_err(|e| ComputeError::Dispatch(format!("vkCreateFence: {e}")))?;
        self.resources.fence = Some(fence);

        let command_buffers = [self.resources.command_buffer];
        let submit = vk::SubmitInfo::default().command_buffers(&command_buffers);
        unsafe { device.queue_submit(self.resources.queue, std::slice::from_ref(&submit), fence) }
            .map_err(|e| ComputeError::Dispatch(format!("vkQueueSubmit: {e}")))?;

        self.resources.in_flight = true;
        self.submitted_at = Some(Instant::now());
        debug!("submitted dispatch");
        Ok(self.into_state())
    }
}

impl Dispatch<'_, Submitted> {
    /// Block until the fence signals. No timeout.
    pub fn wait(mut self) -> Result<Completed> {
        let device = self.resources.device;
        let fence = self
            .resources
            .fence
            .ok_or_else(|| ComputeError::Dispatch("submitted dispatch has no fence".into()))?;

        unsafe { device.wait_for_fences(&[fence], true, u64::MAX) }
            .map_err(|e| ComputeError::Dispatch(format!("vkWaitForFences: {e}")))?;
        self.resources.in_flight = false;

        let elapsed = self.submitted_at.map(|t| t.elapsed()).unwrap_or_default();
        let config = self
            .config
            .ok_or_else(|| ComputeError::Dispatch("submitted dispatch was never recorded".into()))?;
        debug!(elapsed_us = elapsed.as_micros() as u64, "dispatch complete");
        Ok(Completed { config, elapsed })
    }
}
