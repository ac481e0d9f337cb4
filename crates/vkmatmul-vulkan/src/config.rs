//! Compute context configuration.
//!
//! Loads [`ComputeConfig`] from TOML with environment variable overrides via
//! `VKMATMUL_*` prefixed variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::kernels::default_kernel_path;

/// Configuration for a [`crate::ComputeContext`].
///
/// The workgroup edge is not configurable: it is fixed by the kernel's
/// compiled `local_size` ([`crate::KernelContract::WORKGROUP_SIZE`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComputeConfig {
    /// Matrix dimension `N`; operands are `N×N`. Fixed for the lifetime of a context.
    /// Override: `VKMATMUL_MATRIX_SIZE`
    pub matrix_size: u32,

    /// Path of the SPIR-V kernel binary.
    /// Override: `VKMATMUL_KERNEL_PATH`
    pub kernel_path: PathBuf,

    /// Enable `VK_LAYER_KHRONOS_validation` when installed.
    /// Override: `VKMATMUL_ENABLE_VALIDATION`
    pub enable_validation: bool,

    /// Application name reported to the driver.
    pub application_name: String,
}

impl Default for ComputeConfig {
    fn default() -> Self {
        Self {
            matrix_size: 1024,
            kernel_path: default_kernel_path(),
            enable_validation: false,
            application_name: "Matrix Multiply".to_string(),
        }
    }
}

/// Errors that can occur when loading or validating a [`ComputeConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

impl ComputeConfig {
    /// A configuration for an `n×n` multiply with every other field defaulted.
    pub fn with_matrix_size(n: u32) -> Self {
        Self { matrix_size: n, ..Self::default() }
    }

    /// Render the default configuration as TOML.
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields, then apply environment variable overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut cfg: ComputeConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load only from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Number of `f32` elements in one operand.
    pub fn element_count(&self) -> usize {
        let n = self.matrix_size as usize;
        n * n
    }

    /// Size in bytes of one operand buffer.
    pub fn buffer_bytes(&self) -> u64 {
        let n = u64::from(self.matrix_size);
        n * n * std::mem::size_of::<f32>() as u64
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matrix_size == 0 {
            return Err(ConfigError::Validation("matrix_size must be > 0".into()));
        }
        let n = self.matrix_size as usize;
        if n.checked_mul(n).and_then(|e| e.checked_mul(std::mem::size_of::<f32>())).is_none() {
            return Err(ConfigError::Validation(format!(
                "matrix_size {n} overflows the addressable buffer size"
            )));
        }
        if self.kernel_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("kernel_path must not be empty".into()));
        }
        if self.application_name.is_empty() {
            return Err(ConfigError::Validation("application_name must not be empty".into()));
        }
        Ok(())
    }

    /// Apply `VKMATMUL_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("VKMATMUL_MATRIX_SIZE") {
            self.matrix_size = parse_override("VKMATMUL_MATRIX_SIZE", &val)?;
        }

        if let Ok(val) = std::env::var("VKMATMUL_KERNEL_PATH") {
            self.kernel_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("VKMATMUL_ENABLE_VALIDATION") {
            self.enable_validation = match val.to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" | "" => false,
                _ => {
                    return Err(ConfigError::EnvOverride {
                        key: "VKMATMUL_ENABLE_VALIDATION".into(),
                        value: val,
                        reason: "expected a boolean".into(),
                    });
                }
            };
        }

        Ok(())
    }
}

fn parse_override(key: &str, val: &str) -> Result<u32, ConfigError> {
    val.trim().parse::<u32>().map_err(|e| ConfigError::EnvOverride {
        key: key.into(),
        value: val.into(),
        reason: e.to_string(),
    })
}
