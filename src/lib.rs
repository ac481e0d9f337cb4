//! Dense `f32` matrix multiplication on a Vulkan compute pipeline, with CPU baselines.
//!
//! - [`vulkan`]: the compute context (device selection, buffers, pipeline, dispatch).
//! - [`numeric`]: random operands, raw binary matrix files, CPU baselines, comparison.

pub use vkmatmul_numeric as numeric;
pub use vkmatmul_vulkan as vulkan;

pub use vkmatmul_vulkan::{ComputeConfig, ComputeContext, ComputeError};
