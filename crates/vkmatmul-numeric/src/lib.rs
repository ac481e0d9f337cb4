//! Host-side numerics for the Vulkan matmul: random operands, raw binary
//! matrix files, CPU baselines and result comparison.

pub mod compare;
pub mod cpu;
pub mod error;
pub mod io;
pub mod matrix;

pub use compare::{approx_eq, max_relative_error};
pub use cpu::{matmul_parallel, matmul_sequential};
pub use error::{NumericError, Result};
pub use io::{read_from_binary, write_to_binary};
pub use matrix::{DEFAULT_SEED, generate_random_matrix, identity_matrix, seeded_rng};
