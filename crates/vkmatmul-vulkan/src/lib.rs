//! Vulkan compute backend for square `f32` matrix multiplication.
//!
//! [`ComputeContext`] acquires a compute-capable device, uploads two `N×N`
//! row-major operands into host-visible storage buffers, dispatches the
//! matmul kernel and reads the product back. Every device-level object is
//! recorded in a [`ResourceLedger`] as it is created and released in reverse
//! order when the context is dropped.
//!
//! ```no_run
//! use vkmatmul_vulkan::{ComputeConfig, ComputeContext};
//!
//! let mut ctx = ComputeContext::new(&ComputeConfig::with_matrix_size(2))?;
//! let c = ctx.multiply(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0])?;
//! assert_eq!(c, vec![19.0, 22.0, 43.0, 50.0]);
//! # Ok::<(), vkmatmul_vulkan::ComputeError>(())
//! ```

pub mod config;
pub mod context;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod instance;
pub mod kernels;
pub mod ledger;
pub mod logical;
pub mod memory;
pub mod pipeline;
pub mod validation;

pub use config::{ComputeConfig, ConfigError};
pub use context::{ComputeContext, MatmulRun, list_devices};
pub use device::{DeviceCandidate, DeviceDescriptor, select_device};
pub use dispatch::{Completed, DispatchConfig};
pub use error::{ComputeError, Result};
pub use kernels::{KernelContract, MatmulPushConstants};
pub use ledger::{ResourceKind, ResourceLedger};
pub use validation::ValidationLog;
