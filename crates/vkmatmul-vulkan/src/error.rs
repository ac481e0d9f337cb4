//! Vulkan compute error types.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced while building or running a [`crate::ComputeContext`].
///
/// Every variant is fatal for the context instance that produced it: there
/// is no retry and no degraded fallback.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Vulkan loader unavailable: {0}")]
    LoaderUnavailable(String),

    #[error("no Vulkan physical device found")]
    NoSuitableDevice,

    #[error("no physical device exposes a compute-capable queue family")]
    NoComputeQueue,

    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    #[error("no suitable memory type: {0}")]
    NoSuitableMemoryType(String),

    #[error("buffer allocation failed: {0}")]
    BufferAllocation(String),

    #[error("failed to load compute kernel: {0}")]
    ShaderLoad(String),

    #[error("pipeline creation failed: {0}")]
    PipelineCreation(String),

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, ComputeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_no_device() {
        assert_eq!(ComputeError::NoSuitableDevice.to_string(), "no Vulkan physical device found");
    }

    #[test]
    fn display_carries_api_message() {
        let e = ComputeError::DeviceCreation("vkCreateDevice: ERROR_INITIALIZATION_FAILED".into());
        assert!(e.to_string().contains("ERROR_INITIALIZATION_FAILED"));
    }

    #[test]
    fn display_buffer_allocation() {
        let e = ComputeError::BufferAllocation("vkAllocateMemory failed: ERROR_OUT_OF_DEVICE_MEMORY".into());
        assert_eq!(e.to_string(), "buffer allocation failed: vkAllocateMemory failed: ERROR_OUT_OF_DEVICE_MEMORY");
    }

    #[test]
    fn config_error_converts() {
        let e: ComputeError = ConfigError::Validation("matrix_size must be > 0".into()).into();
        assert!(matches!(e, ComputeError::Config(_)));
        assert!(e.to_string().contains("matrix_size"));
    }
}
