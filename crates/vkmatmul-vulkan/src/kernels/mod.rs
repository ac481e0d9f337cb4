//! Matmul compute kernel: host-side contract and bundled GLSL source.
//!
//! The kernel itself is an opaque SPIR-V blob loaded from disk. What the
//! host can state about it is collected in [`KernelContract`]: entry point,
//! binding indices, push-constant layout and workgroup size. The bundled
//! `shaders/matmul.comp` is compiled by `build.rs` when `glslc` is on
//! `PATH`; any other binary honouring the same contract can be used instead.

use std::ffi::CStr;
use std::path::PathBuf;

use bytemuck::{Pod, Zeroable};

/// GLSL source for the matmul compute shader.
pub const MATMUL_GLSL: &str = include_str!("../../shaders/matmul.comp");

/// Kernel path used when neither the config nor the build script supply one.
pub const FALLBACK_KERNEL_PATH: &str = "shaders/matmul.spv";

/// SPIR-V magic number (little-endian first word).
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Path of the SPIR-V kernel compiled by the build script, if it ran.
pub fn default_kernel_path() -> PathBuf {
    match option_env!("VKMATMUL_MATMUL_SPV") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(FALLBACK_KERNEL_PATH),
    }
}

/// Interface the host assumes the kernel binary was compiled against.
pub struct KernelContract;

impl KernelContract {
    /// Shader entry point.
    pub const ENTRY_POINT: &'static CStr = c"main";
    /// Number of storage-buffer bindings in descriptor set 0.
    pub const BUF_COUNT: u32 = 3;
    /// Binding of operand A.
    pub const BINDING_A: u32 = 0;
    /// Binding of operand B.
    pub const BINDING_B: u32 = 1;
    /// Binding of result C.
    pub const BINDING_C: u32 = 2;
    /// Size in bytes of the push-constant block (one `u32`, the dimension N).
    pub const PUSH_CONSTANT_SIZE: u32 = std::mem::size_of::<MatmulPushConstants>() as u32;
    /// `local_size_x` / `local_size_y` of the bundled shader.
    pub const WORKGROUP_SIZE: u32 = 16;
}

/// Push constants consumed by the matmul kernel.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct MatmulPushConstants {
    pub n: u32,
}

/// Structural checks on a SPIR-V blob.
///
/// This is as far as the host can verify the kernel: bindings and the push
/// constant layout are trusted, not inspected.
pub struct SpirvValidator;

impl SpirvValidator {
    /// Validate raw SPIR-V `bytes`.
    ///
    /// Checks, in order:
    /// 1. Length is at least the 5-word header and a multiple of 4.
    /// 2. Magic number matches [`SPIRV_MAGIC`].
    /// 3. Version word is SPIR-V 1.0 – 1.6.
    pub fn validate_bytes(bytes: &[u8]) -> Result<(), String> {
        Self::check_length(bytes)?;
        Self::check_magic(bytes)?;
        Self::check_version(bytes)?;
        Ok(())
    }

    pub fn check_length(bytes: &[u8]) -> Result<(), String> {
        if bytes.len() < 20 {
            return Err(format!("SPIR-V binary too short: {} bytes (minimum 20)", bytes.len()));
        }
        if bytes.len() % 4 != 0 {
            return Err(format!("SPIR-V binary length {} is not a multiple of 4", bytes.len()));
        }
        Ok(())
    }

    pub fn check_magic(bytes: &[u8]) -> Result<(), String> {
        if bytes.len() < 4 {
            return Err("too short for magic number".into());
        }
        let magic = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if magic != SPIRV_MAGIC {
            return Err(format!("bad magic: expected 0x{SPIRV_MAGIC:08X}, got 0x{magic:08X}"));
        }
        Ok(())
    }

    pub fn check_version(bytes: &[u8]) -> Result<(), String> {
        if bytes.len() < 8 {
            return Err("too short for version word".into());
        }
        let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        // Major in bits 23:16, minor in bits 15:8.
        let major = (version >> 16) & 0xFF;
        let minor = (version >> 8) & 0xFF;
        if major != 1 || minor > 6 {
            return Err(format!("unsupported SPIR-V version {major}.{minor}"));
        }
        Ok(())
    }
}
