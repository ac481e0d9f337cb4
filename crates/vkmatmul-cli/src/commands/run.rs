//! `gpu`, `sequential` and `cpu`: multiply two random matrices on one backend.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;
use vkmatmul_numeric::{DEFAULT_SEED, generate_random_matrix, matmul_parallel, matmul_sequential, seeded_rng, write_to_binary};
use vkmatmul_vulkan::{ComputeConfig, ComputeContext};

use crate::config::CliConfig;
use crate::output::{OutputFormat, RunReport, emit_result, top_left};

/// Where the multiplication runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Vulkan compute pipeline.
    Gpu,
    /// Single-threaded triple loop.
    Sequential,
    /// Rows in parallel on all cores.
    Cpu,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpu => write!(f, "gpu"),
            Self::Sequential => write!(f, "sequential"),
            Self::Cpu => write!(f, "cpu"),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct MatmulArgs {
    /// Matrix dimension N [default: compute.matrix_size]
    #[arg(short = 'n', long, value_name = "N")]
    pub size: Option<u32>,

    /// Seed for the random operands
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Write C as raw little-endian f32 to PATH
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print the top-left K×K entries of C
    #[arg(long, value_name = "K", default_value_t = 12)]
    pub print_limit: usize,

    /// Result format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// The two random operands for a run.
pub struct Operands {
    pub n: usize,
    pub a: Vec<f32>,
    pub b: Vec<f32>,
}

impl Operands {
    /// A then B from one generator seeded with `seed`.
    pub fn generate(n: u32, seed: u64) -> Self {
        let n = n as usize;
        let mut rng = seeded_rng(seed);
        let a = generate_random_matrix(n, &mut rng);
        let b = generate_random_matrix(n, &mut rng);
        Self { n, a, b }
    }
}

/// `C` and how long it took.
pub struct Product {
    pub c: Vec<f32>,
    pub elapsed: Duration,
    pub gpu: Option<Duration>,
    pub device: Option<String>,
}

/// Resolve `--size` against the configured default and run it through the
/// same validation as the `[compute]` section.
pub fn matrix_size(size: Option<u32>, config: &CliConfig) -> Result<u32> {
    let compute = ComputeConfig { matrix_size: size.unwrap_or(config.compute.matrix_size), ..config.compute.clone() };
    compute.validate().context("invalid matrix size")?;
    Ok(compute.matrix_size)
}

/// Multiply `ops.a × ops.b` on `backend`.
pub fn compute_product(backend: Backend, compute: &ComputeConfig, ops: &Operands) -> Result<Product> {
    match backend {
        Backend::Gpu => {
            let config = ComputeConfig { matrix_size: ops.n as u32, ..compute.clone() };
            let mut ctx = ComputeContext::new(&config).context("failed to initialize Vulkan compute context")?;
            let run = ctx.run(&ops.a, &ops.b).context("GPU multiplication failed")?;
            Ok(Product {
                c: run.output,
                elapsed: run.total,
                gpu: Some(run.dispatch.elapsed),
                device: Some(ctx.device_name().to_string()),
            })
        }
        Backend::Sequential | Backend::Cpu => {
            let start = Instant::now();
            let c = if backend == Backend::Sequential {
                matmul_sequential(&ops.a, &ops.b, ops.n)?
            } else {
                matmul_parallel(&ops.a, &ops.b, ops.n)?
            };
            Ok(Product { c, elapsed: start.elapsed(), gpu: None, device: None })
        }
    }
}

impl MatmulArgs {
    pub fn execute(self, backend: Backend, config: &CliConfig) -> Result<()> {
        let n = matrix_size(self.size, config)?;
        info!(%backend, n, seed = self.seed, "Generating operands");
        let ops = Operands::generate(n, self.seed);

        let product = compute_product(backend, &config.compute, &ops)?;
        info!(%backend, n, elapsed_ms = product.elapsed.as_secs_f64() * 1e3, "Multiplication finished");

        if let Some(path) = &self.output {
            write_to_binary(path, &product.c).with_context(|| format!("failed to write {}", path.display()))?;
        }

        let report = RunReport {
            backend: backend.to_string(),
            matrix_size: n,
            seed: self.seed,
            elapsed_ms: product.elapsed.as_secs_f64() * 1e3,
            gpu_ms: product.gpu.map(|d| d.as_secs_f64() * 1e3),
            device: product.device,
            output: self.output.as_ref().map(|p| p.display().to_string()),
            preview: top_left(&product.c, ops.n, self.print_limit),
        };
        emit_result(self.format, &report, |r| print!("{r}"))
    }
}
