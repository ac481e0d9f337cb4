//! Host-visible storage buffers: memory-type lookup, allocation, upload and readback.

use std::fmt;

use ash::vk;
use tracing::debug;

use crate::error::{ComputeError, Result};
use crate::kernels::KernelContract;
use crate::ledger::{ResourceLedger, TrackedResource};

/// Memory properties every operand buffer is allocated with.
pub const HOST_MEMORY_FLAGS: vk::MemoryPropertyFlags =
    vk::MemoryPropertyFlags::from_raw(
        vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
    );

/// Which operand a buffer holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Left operand, host → device.
    InputA,
    /// Right operand, host → device.
    InputB,
    /// Result, device → host.
    Output,
}

impl BufferRole {
    /// Descriptor binding the kernel expects this operand at.
    pub fn binding(self) -> u32 {
        match self {
            Self::InputA => KernelContract::BINDING_A,
            Self::InputB => KernelContract::BINDING_B,
            Self::Output => KernelContract::BINDING_C,
        }
    }
}

impl fmt::Display for BufferRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputA => write!(f, "A"),
            Self::InputB => write!(f, "B"),
            Self::Output => write!(f, "C"),
        }
    }
}

/// A storage buffer with its bound memory.
///
/// Only produced once memory is bound, so a `GpuBuffer` can always be
/// dispatched against. Both handles are owned by the ledger they were
/// tracked in.
#[derive(Debug, Clone, Copy)]
pub struct GpuBuffer {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    /// Requested size in bytes (the allocation may be larger).
    pub size: vk::DeviceSize,
    pub role: BufferRole,
}

/// The A, B and C operand buffers, all the same size.
#[derive(Debug, Clone, Copy)]
pub struct BufferTriple {
    pub a: GpuBuffer,
    pub b: GpuBuffer,
    pub c: GpuBuffer,
}

impl BufferTriple {
    /// Create the three buffers of `size` bytes each.
    pub fn new(
        device: &ash::Device,
        memory_properties: &vk::PhysicalDeviceMemoryProperties,
        ledger: &mut ResourceLedger,
        size: vk::DeviceSize,
    ) -> Result<Self> {
        let a = create_buffer(device, memory_properties, ledger, size, BufferRole::InputA)?;
        let b = create_buffer(device, memory_properties, ledger, size, BufferRole::InputB)?;
        let c = create_buffer(device, memory_properties, ledger, size, BufferRole::Output)?;
        Ok(Self { a, b, c })
    }

    /// Buffers in binding order.
    pub fn in_binding_order(&self) -> [&GpuBuffer; 3] {
        [&self.a, &self.b, &self.c]
    }
}

/// Find the lowest memory type index allowed by `type_filter` whose flags
/// include all of `required_flags`.
pub fn find_memory_type(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    required_flags: vk::MemoryPropertyFlags,
) -> Result<u32> {
    let count = memory_properties.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    for i in 0..count {
        let type_ok = (type_filter & (1 << i)) != 0;
        let flags_ok = memory_properties.memory_types[i as usize].property_flags.contains(required_flags);
        if type_ok && flags_ok {
            return Ok(i);
        }
    }
    Err(ComputeError::NoSuitableMemoryType(format!(
        "no memory type with filter={type_filter:#x} flags={required_flags:?}"
    )))
}

/// Allocate memory for `buffer` with `properties` and bind it at offset 0.
///
/// The allocation is tracked before binding, so a failed bind still frees it.
pub fn allocate_and_bind(
    device: &ash::Device,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    ledger: &mut ResourceLedger,
    buffer: vk::Buffer,
    properties: vk::MemoryPropertyFlags,
) -> Result<vk::DeviceMemory> {
    let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
    let memory_type_index = find_memory_type(memory_properties, requirements.memory_type_bits, properties)?;

    let alloc_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);

    let memory = unsafe { device.allocate_memory(&alloc_info, None) }
        .map_err(|e| ComputeError::BufferAllocation(format!("vkAllocateMemory failed: {e}")))?;
    ledger.track(TrackedResource::Memory(memory));

    unsafe { device.bind_buffer_memory(buffer, memory, 0) }
        .map_err(|e| ComputeError::BufferAllocation(format!("vkBindBufferMemory failed: {e}")))?;

    debug!(memory_type_index, size = requirements.size, "bound buffer memory");
    Ok(memory)
}

/// Create a host-visible, host-coherent storage buffer of `size` bytes.
pub fn create_buffer(
    device: &ash::Device,
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    ledger: &mut ResourceLedger,
    size: vk::DeviceSize,
    role: BufferRole,
) -> Result<GpuBuffer> {
    let buffer_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(vk::BufferUsageFlags::STORAGE_BUFFER)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);

    let buffer = unsafe { device.create_buffer(&buffer_info, None) }
        .map_err(|e| ComputeError::BufferAllocation(format!("vkCreateBuffer failed: {e}")))?;
    ledger.track(TrackedResource::Buffer(buffer));

    let memory = allocate_and_bind(device, memory_properties, ledger, buffer, HOST_MEMORY_FLAGS)?;

    debug!(%role, size, "allocated storage buffer");
    Ok(GpuBuffer { buffer, memory, size, role })
}

/// Copy `data` into the start of `target`: map, memcpy, unmap.
pub fn write_buffer(device: &ash::Device, target: &GpuBuffer, data: &[f32]) -> Result<()> {
    let bytes: &[u8] = bytemuck::cast_slice(data);
    if bytes.len() as vk::DeviceSize > target.size {
        return Err(ComputeError::InvalidDimensions(format!(
            "{} bytes do not fit buffer {} of {} bytes",
            bytes.len(),
            target.role,
            target.size
        )));
    }

    unsafe {
        let ptr = device
            .map_memory(target.memory, 0, bytes.len() as vk::DeviceSize, vk::MemoryMapFlags::empty())
            .map_err(|e| ComputeError::Dispatch(format!("vkMapMemory({}) failed: {e}", target.role)))?;
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
        device.unmap_memory(target.memory);
    }
    Ok(())
}

/// Read `len` floats from the start of `source`: map, memcpy, unmap.
pub fn read_buffer(device: &ash::Device, source: &GpuBuffer, len: usize) -> Result<Vec<f32>> {
    let mut out = vec![0.0f32; len];
    let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut out);
    if bytes.len() as vk::DeviceSize > source.size {
        return Err(ComputeError::InvalidDimensions(format!(
            "cannot read {} bytes from buffer {} of {} bytes",
            bytes.len(),
            source.role,
            source.size
        )));
    }

    unsafe {
        let ptr = device
            .map_memory(source.memory, 0, bytes.len() as vk::DeviceSize, vk::MemoryMapFlags::empty())
            .map_err(|e| ComputeError::Dispatch(format!("vkMapMemory({}) failed: {e}", source.role)))?;
        std::ptr::copy_nonoverlapping(ptr.cast::<u8>().cast_const(), bytes.as_mut_ptr(), bytes.len());
        device.unmap_memory(source.memory);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table(flags: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties::default();
        props.memory_type_count = flags.len() as u32;
        for (i, f) in flags.iter().enumerate() {
            props.memory_types[i].property_flags = *f;
        }
        props
    }

    const DEVICE_LOCAL: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::DEVICE_LOCAL;

    #[test]
    fn find_memory_type_no_match() {
        let props = vk::PhysicalDeviceMemoryProperties::default();
        let result = find_memory_type(&props, 0xFFFF_FFFF, DEVICE_LOCAL);
        assert!(matches!(result, Err(ComputeError::NoSuitableMemoryType(_))));
    }

    #[test]
    fn find_memory_type_flags_not_satisfied() {
        let props = table(&[DEVICE_LOCAL, vk::MemoryPropertyFlags::HOST_VISIBLE]);
        let result = find_memory_type(&props, 0b11, HOST_MEMORY_FLAGS);
        assert!(matches!(result, Err(ComputeError::NoSuitableMemoryType(_))));
    }

    #[test]
    fn find_memory_type_returns_lowest_match() {
        let props = table(&[
            DEVICE_LOCAL,
            HOST_MEMORY_FLAGS,
            HOST_MEMORY_FLAGS | vk::MemoryPropertyFlags::HOST_CACHED,
            HOST_MEMORY_FLAGS,
        ]);
        assert_eq!(find_memory_type(&props, 0b1111, HOST_MEMORY_FLAGS).unwrap(), 1);
    }

    #[test]
    fn find_memory_type_respects_type_filter() {
        let props = table(&[HOST_MEMORY_FLAGS, HOST_MEMORY_FLAGS, HOST_MEMORY_FLAGS]);
        assert_eq!(find_memory_type(&props, 0b100, HOST_MEMORY_FLAGS).unwrap(), 2);
        assert!(find_memory_type(&props, 0b1000, HOST_MEMORY_FLAGS).is_err());
    }

    #[test]
    fn superset_flags_accepted() {
        let props = table(&[DEVICE_LOCAL | HOST_MEMORY_FLAGS]);
        assert_eq!(find_memory_type(&props, 1, HOST_MEMORY_FLAGS).unwrap(), 0);
    }

    #[test]
    fn host_flags_are_visible_and_coherent() {
        assert!(HOST_MEMORY_FLAGS.contains(vk::MemoryPropertyFlags::HOST_VISIBLE));
        assert!(HOST_MEMORY_FLAGS.contains(vk::MemoryPropertyFlags::HOST_COHERENT));
    }

    #[test]
    fn roles_map_to_contract_bindings() {
        assert_eq!(BufferRole::InputA.binding(), 0);
        assert_eq!(BufferRole::InputB.binding(), 1);
        assert_eq!(BufferRole::Output.binding(), 2);
        assert_eq!(BufferRole::Output.to_string(), "C");
    }

    proptest! {
        #[test]
        fn lookup_matches_linear_scan(
            raw_flags in proptest::collection::vec(0u32..16, 1..32),
            filter in any::<u32>(),
            required in 0u32..16,
        ) {
            let flags: Vec<vk::MemoryPropertyFlags> =
                raw_flags.iter().map(|&f| vk::MemoryPropertyFlags::from_raw(f)).collect();
            let props = table(&flags);
            let required = vk::MemoryPropertyFlags::from_raw(required);

            let expected = (0..flags.len() as u32)
                .find(|&i| filter & (1 << i) != 0 && flags[i as usize].contains(required));

            match find_memory_type(&props, filter, required) {
                Ok(index) => prop_assert_eq!(Some(index), expected),
                Err(_) => prop_assert_eq!(None, expected),
            }
        }
    }
}
