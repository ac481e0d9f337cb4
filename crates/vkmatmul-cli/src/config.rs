//! CLI configuration: compute settings plus logging, read from `vkmatmul.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vkmatmul_vulkan::ComputeConfig;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "vkmatmul.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub compute: ComputeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace`, `debug`, `info`, `warn`, `error`, or any `EnvFilter` directive.
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

const LOG_FORMATS: [&str; 3] = ["pretty", "compact", "json"];

impl CliConfig {
    pub fn default_config_path() -> PathBuf {
        PathBuf::from(DEFAULT_CONFIG_FILE)
    }

    pub fn validate(&self) -> Result<()> {
        self.compute.validate().context("invalid [compute] section")?;
        if !LOG_FORMATS.contains(&self.logging.format.as_str()) {
            anyhow::bail!(
                "invalid logging.format '{}', expected one of: {}",
                self.logging.format,
                LOG_FORMATS.join(", ")
            );
        }
        Ok(())
    }
}

/// Layers file, environment and command-line values into a [`CliConfig`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: CliConfig,
    log_level: Option<String>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: CliConfig =
            toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Self { config, ..Self::default() })
    }

    pub fn log_level(mut self, level: Option<String>) -> Self {
        self.log_level = level;
        self
    }

    /// Apply `VKMATMUL_*` overrides, then `--log-level`, then validate.
    pub fn build(self) -> Result<CliConfig> {
        let mut config = self.config;
        config.compute.apply_env_overrides().context("invalid environment override")?;
        if let Some(level) = self.log_level {
            config.logging.level = level;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Resolve the configuration for this invocation.
///
/// An explicit `--config` path must load. Without one, `vkmatmul.toml` in the
/// working directory is used if present, otherwise defaults.
pub fn load_configuration(path: Option<&Path>, log_level: Option<String>) -> Result<CliConfig> {
    let builder = match path {
        Some(path) => ConfigBuilder::from_file(path)?,
        None => {
            let default_path = CliConfig::default_config_path();
            if default_path.exists() { ConfigBuilder::from_file(&default_path)? } else { ConfigBuilder::new() }
        }
    };
    builder.log_level(log_level).build().context("failed to build configuration")
}
