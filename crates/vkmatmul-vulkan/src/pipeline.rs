//! Compute pipeline construction from a SPIR-V kernel binary.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use ash::vk;
use tracing::debug;

use crate::error::{ComputeError, Result};
use crate::kernels::{KernelContract, SpirvValidator};
use crate::ledger::{ResourceLedger, TrackedResource};
use crate::memory::BufferTriple;

/// A structurally valid SPIR-V module, as 32-bit words.
#[derive(Debug, Clone)]
pub struct KernelBinary {
    words: Vec<u32>,
    source: Option<PathBuf>,
}

impl KernelBinary {
    /// Read and check the kernel at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading compute kernel");
        let bytes = std::fs::read(path)
            .map_err(|e| ComputeError::ShaderLoad(format!("{}: {e}", path.display())))?;
        let mut binary = Self::from_bytes(&bytes)
            .map_err(|e| ComputeError::ShaderLoad(format!("{}: {}", path.display(), strip_prefix(&e))))?;
        binary.source = Some(path.to_path_buf());
        Ok(binary)
    }

    /// Check raw bytes and convert them to words.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        SpirvValidator::validate_bytes(bytes).map_err(ComputeError::ShaderLoad)?;
        let words = ash::util::read_spv(&mut Cursor::new(bytes))
            .map_err(|e| ComputeError::ShaderLoad(format!("invalid SPIR-V word stream: {e}")))?;
        Ok(Self { words, source: None })
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    pub fn byte_len(&self) -> usize {
        self.words.len() * 4
    }

    /// File the binary was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

fn strip_prefix(err: &ComputeError) -> String {
    match err {
        ComputeError::ShaderLoad(msg) => msg.clone(),
        other => other.to_string(),
    }
}

/// Read the kernel binary at `path`.
pub fn load_kernel(path: &Path) -> Result<KernelBinary> {
    KernelBinary::load(path)
}

/// The three storage-buffer bindings, A, B and C, visible to the compute stage.
pub fn layout_bindings() -> [vk::DescriptorSetLayoutBinding<'static>; KernelContract::BUF_COUNT as usize] {
    [KernelContract::BINDING_A, KernelContract::BINDING_B, KernelContract::BINDING_C].map(|binding| {
        vk::DescriptorSetLayoutBinding::default()
            .binding(binding)
            .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
            .descriptor_count(1)
            .stage_flags(vk::ShaderStageFlags::COMPUTE)
    })
}

/// One `u32` at offset 0, compute stage only.
pub fn push_constant_range() -> vk::PushConstantRange {
    vk::PushConstantRange::default()
        .stage_flags(vk::ShaderStageFlags::COMPUTE)
        .offset(0)
        .size(KernelContract::PUSH_CONSTANT_SIZE)
}

/// Pool sizes for a single set of [`KernelContract::BUF_COUNT`] storage buffers.
pub fn descriptor_pool_sizes() -> [vk::DescriptorPoolSize; 1] {
    [vk::DescriptorPoolSize::default()
        .ty(vk::DescriptorType::STORAGE_BUFFER)
        .descriptor_count(KernelContract::BUF_COUNT)]
}

/// Create the 3-slot descriptor-set layout.
pub fn descriptor_set_layout(device: &ash::Device, ledger: &mut ResourceLedger) -> Result<vk::DescriptorSetLayout> {
    let bindings = layout_bindings();
    let info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
    let layout = unsafe { device.create_descriptor_set_layout(&info, None) }
        .map_err(|e| ComputeError::PipelineCreation(format!("vkCreateDescriptorSetLayout: {e}")))?;
    ledger.track(TrackedResource::DescriptorSetLayout(layout));
    debug!(bindings = bindings.len(), "created descriptor set layout");
    Ok(layout)
}

/// Handles making up the compute pipeline. All of them are owned by the ledger.
#[derive(Debug, Clone, Copy)]
pub struct ComputePipeline {
    pub descriptor_set_layout: vk::DescriptorSetLayout,
    pub shader_module: vk::ShaderModule,
    pub pipeline_layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

impl ComputePipeline {
    /// Build layout, shader module, pipeline layout and pipeline, in that order.
    pub fn build(device: &ash::Device, kernel: &KernelBinary, ledger: &mut ResourceLedger) -> Result<Self> {
        let descriptor_set_layout = descriptor_set_layout(device, ledger)?;
        build_pipeline(device, kernel, descriptor_set_layout, ledger)
    }
}

/// Shader module → pipeline layout → compute pipeline, on an existing set layout.
pub fn build_pipeline(
    device: &ash::Device,
    kernel: &KernelBinary,
    descriptor_set_layout: vk::DescriptorSetLayout,
    ledger: &mut ResourceLedger,
) -> Result<ComputePipeline> {
    let module_info = vk::ShaderModuleCreateInfo::default().code(kernel.words());
    let shader_module = unsafe { device.create_shader_module(&module_info, None) }
        .map_err(|e| ComputeError::PipelineCreation(format!("vkCreateShaderModule: {e}")))?;
    ledger.track(TrackedResource::ShaderModule(shader_module));
    debug!(bytes = kernel.byte_len(), "created shader module");

    let set_layouts = [descriptor_set_layout];
    let push_ranges = [push_constant_range()];
    let layout_info =
        vk::PipelineLayoutCreateInfo::default().set_layouts(&set_layouts).push_constant_ranges(&push_ranges);
    let pipeline_layout = unsafe { device.create_pipeline_layout(&layout_info, None) }
        .map_err(|e| ComputeError::PipelineCreation(format!("vkCreatePipelineLayout: {e}")))?;
    ledger.track(TrackedResource::PipelineLayout(pipeline_layout));
    debug!("created pipeline layout");

    let stage = vk::PipelineShaderStageCreateInfo::default()
        .stage(vk::ShaderStageFlags::COMPUTE)
        .module(shader_module)
        .name(KernelContract::ENTRY_POINT);
    let pipeline_info = vk::ComputePipelineCreateInfo::default().stage(stage).layout(pipeline_layout);

    let pipeline = match unsafe {
        device.create_compute_pipelines(vk::PipelineCache::null(), std::slice::from_ref(&pipeline_info), None)
    } {
        Ok(pipelines) => pipelines.into_iter().next().ok_or_else(|| {
            ComputeError::PipelineCreation("vkCreateComputePipelines returned no pipeline".into())
        })?,
        Err((partial, e)) => {
            for p in partial.into_iter().filter(|p| *p != vk::Pipeline::null()) {
                ledger.track(TrackedResource::Pipeline(p));
            }
            return Err(ComputeError::PipelineCreation(format!("vkCreateComputePipelines: {e}")));
        }
    };
    ledger.track(TrackedResource::Pipeline(pipeline));
    debug!(entry = ?KernelContract::ENTRY_POINT, "created compute pipeline");

    Ok(ComputePipeline { descriptor_set_layout, shader_module, pipeline_layout, pipeline })
}

/// Create a pool holding exactly one 3-buffer descriptor set.
pub fn create_descriptor_pool(device: &ash::Device, ledger: &mut ResourceLedger) -> Result<vk::DescriptorPool> {
    let sizes = descriptor_pool_sizes();
    let info = vk::DescriptorPoolCreateInfo::default().max_sets(1).pool_sizes(&sizes);
    let pool = unsafe { device.create_descriptor_pool(&info, None) }
        .map_err(|e| ComputeError::PipelineCreation(format!("vkCreateDescriptorPool: {e}")))?;
    ledger.track(TrackedResource::DescriptorPool(pool));
    debug!("created descriptor pool");
    Ok(pool)
}

/// Reset `pool`, allocate its one set and point bindings 0/1/2 at A/B/C.
pub fn bind_buffers(
    device: &ash::Device,
    pool: vk::DescriptorPool,
    layout: vk::DescriptorSetLayout,
    buffers: &BufferTriple,
) -> Result<vk::DescriptorSet> {
    unsafe { device.reset_descriptor_pool(pool, vk::DescriptorPoolResetFlags::empty()) }
        .map_err(|e| ComputeError::Dispatch(format!("vkResetDescriptorPool: {e}")))?;

    let layouts = [layout];
    let alloc_info = vk::DescriptorSetAllocateInfo::default().descriptor_pool(pool).set_layouts(&layouts);
    let set = unsafe { device.allocate_descriptor_sets(&alloc_info) }
        .map_err(|e| ComputeError::Dispatch(format!("vkAllocateDescriptorSets: {e}")))?
        .into_iter()
        .next()
        .ok_or_else(|| ComputeError::Dispatch("vkAllocateDescriptorSets returned no set".into()))?;

    let infos = buffers.in_binding_order().map(|b| {
        [vk::DescriptorBufferInfo::default().buffer(b.buffer).offset(0).range(vk::WHOLE_SIZE)]
    });
    let roles = buffers.in_binding_order().map(|b| b.role);
    let writes: Vec<vk::WriteDescriptorSet<'_>> = roles
        .iter()
        .zip(infos.iter())
        .map(|(role, info)| {
            vk::WriteDescriptorSet::default()
                .dst_set(set)
                .dst_binding(role.binding())
                .descriptor_type(vk::DescriptorType::STORAGE_BUFFER)
                .buffer_info(info)
        })
        .collect();

    unsafe { device.update_descriptor_sets(&writes, &[]) };
    Ok(set)
}
