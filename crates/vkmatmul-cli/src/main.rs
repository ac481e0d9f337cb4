//! vkmatmul CLI
//!
//! Multiplies random square matrices on a Vulkan compute pipeline or on the
//! CPU, and checks the two against each other.

use std::io;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use tracing::error;

use vkmatmul_cli::commands::{Backend, CompareCommand, InfoCommand, MatmulArgs, ToleranceExceeded};
use vkmatmul_cli::config::{CliConfig, load_configuration};
use vkmatmul_cli::exit::{EXIT_GENERIC_FAIL, EXIT_TOLERANCE_EXCEEDED};

/// Dense f32 matrix multiplication on Vulkan, with CPU baselines
#[derive(Parser)]
#[command(name = "vkmatmul")]
#[command(about = "Dense f32 matrix multiplication on Vulkan, with CPU baselines")]
#[command(long_about = r#"
Multiplies two random N×N f32 matrices with a Vulkan compute shader or on the
CPU and reports how long it took.

Examples:
  # GPU run at the configured size
  vkmatmul gpu

  # Parallel CPU baseline, saving C for later inspection
  vkmatmul cpu --size 512 --output cpu.bin

  # Check the GPU against the sequential baseline
  vkmatmul compare --size 256 --tolerance 1e-4

  # List Vulkan devices
  vkmatmul info
"#)]
#[command(version)]
struct Cli {
    /// Configuration file path [default: ./vkmatmul.toml if present]
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Multiply on the Vulkan compute pipeline
    Gpu(MatmulArgs),

    /// Multiply with the single-threaded CPU baseline
    #[command(alias = "seq")]
    Sequential(MatmulArgs),

    /// Multiply with the multi-threaded CPU baseline
    Cpu(MatmulArgs),

    /// Compare the GPU result against a CPU baseline
    Compare(CompareCommand),

    /// Show Vulkan devices and compute queue families
    Info(InfoCommand),

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Show the default configuration file path
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        generate_completions(shell);
        return Ok(());
    }

    let config = load_configuration(cli.config.as_deref(), cli.log_level.clone())?;
    setup_logging(&config);

    let result = match cli.command {
        Some(Commands::Gpu(args)) => args.execute(Backend::Gpu, &config),
        Some(Commands::Sequential(args)) => args.execute(Backend::Sequential, &config),
        Some(Commands::Cpu(args)) => args.execute(Backend::Cpu, &config),
        Some(Commands::Compare(cmd)) => cmd.execute(&config),
        Some(Commands::Info(cmd)) => cmd.execute(&config),
        Some(Commands::Config { action }) => handle_config_command(action, &config),
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            Ok(())
        }
    };

    if let Err(e) = result {
        error!("Command failed: {e}");

        for cause in e.chain().skip(1) {
            error!("  Caused by: {cause}");
        }

        let code = if e.is::<ToleranceExceeded>() { EXIT_TOLERANCE_EXCEEDED } else { EXIT_GENERIC_FAIL };
        std::process::exit(code);
    }

    Ok(())
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn setup_logging(config: &CliConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(io::stderr);

    match config.logging.format.as_str() {
        "json" => subscriber.json().with_timer(tracing_subscriber::fmt::time::uptime()).init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.pretty().init(),
    }
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut io::stdout());
}

fn handle_config_command(action: ConfigAction, config: &CliConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config_str = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
            println!("{config_str}");
        }
        ConfigAction::Path => {
            println!("{}", CliConfig::default_config_path().display());
        }
    }
    Ok(())
}
