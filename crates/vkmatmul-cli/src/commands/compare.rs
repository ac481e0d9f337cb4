//! `compare`: GPU against a CPU baseline on identical operands.

use anyhow::Result;
use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::info;
use vkmatmul_numeric::{DEFAULT_SEED, max_relative_error};

use super::run::{Backend, Operands, compute_product, matrix_size};
use crate::config::CliConfig;
use crate::output::{OutputFormat, emit_result};

/// GPU result differs from the baseline by more than the tolerance.
#[derive(Debug, thiserror::Error)]
#[error("max relative error {max_error:e} exceeds tolerance {tolerance:e}")]
pub struct ToleranceExceeded {
    pub max_error: f32,
    pub tolerance: f32,
}

/// Check the GPU result against a CPU baseline
#[derive(Debug, Parser)]
pub struct CompareCommand {
    /// Matrix dimension N [default: compute.matrix_size]
    #[arg(short = 'n', long, value_name = "N")]
    pub size: Option<u32>,

    /// Seed for the random operands
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Largest acceptable relative error
    #[arg(long, default_value_t = 1e-3)]
    pub tolerance: f32,

    /// CPU implementation to compare against
    #[arg(long, value_enum, default_value_t = Backend::Sequential)]
    pub baseline: Backend,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct CompareReport {
    pub matrix_size: u32,
    pub seed: u64,
    pub baseline: String,
    pub device: Option<String>,
    pub gpu_ms: f64,
    pub baseline_ms: f64,
    pub max_relative_error: f32,
    pub tolerance: f32,
    pub passed: bool,
}

impl CompareCommand {
    pub fn execute(self, config: &CliConfig) -> Result<()> {
        anyhow::ensure!(self.baseline != Backend::Gpu, "baseline must be a CPU backend (sequential or cpu)");
        anyhow::ensure!(self.tolerance >= 0.0, "tolerance must be non-negative");

        let n = matrix_size(self.size, config)?;
        let ops = Operands::generate(n, self.seed);

        let gpu = compute_product(Backend::Gpu, &config.compute, &ops)?;
        let cpu = compute_product(self.baseline, &config.compute, &ops)?;
        let max_error = max_relative_error(&cpu.c, &gpu.c)?;
        let passed = max_error <= self.tolerance;

        info!(n, baseline = %self.baseline, max_error, tolerance = self.tolerance, passed, "Comparison finished");

        let report = CompareReport {
            matrix_size: n,
            seed: self.seed,
            baseline: self.baseline.to_string(),
            device: gpu.device,
            gpu_ms: gpu.elapsed.as_secs_f64() * 1e3,
            baseline_ms: cpu.elapsed.as_secs_f64() * 1e3,
            max_relative_error: max_error,
            tolerance: self.tolerance,
            passed,
        };
        emit_result(self.format, &report, |r| {
            println!("  Device:         {}", r.device.as_deref().unwrap_or("unknown"));
            println!("  Matrix size:    {0}×{0}", r.matrix_size);
            println!("  GPU:            {:.3} ms", r.gpu_ms);
            println!("  {:<16}{:.3} ms", format!("{}:", r.baseline), r.baseline_ms);
            println!("  Max rel. error: {:e} (tolerance {:e})", r.max_relative_error, r.tolerance);
            if r.passed {
                println!("{}", style("PASS").green().bold());
            } else {
                println!("{}", style("FAIL").red().bold());
            }
        })?;

        if passed { Ok(()) } else { Err(ToleranceExceeded { max_error, tolerance: self.tolerance }.into()) }
    }
}
