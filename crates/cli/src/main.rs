//! suiterun CLI - Main Entry Point
//!
//! Runs, lists and validates declarative YAML test suites.
//!
//! Exit codes: 0 when every test passed (or every suite is valid), 1 when a
//! test failed (or a suite is invalid), 2 when the run itself could not be
//! carried out.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

mod commands;
mod output;

use commands::{list, run, validate};
use suiterun_runner::{RunnerConfig, DEFAULT_CONFIG_FILE};

/// suiterun - hook-aware test suite runner
#[derive(Parser)]
#[command(name = "suiterun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run suites and report outcomes
    Run(run::RunArgs),

    /// List tests and whether a run would execute them
    List(list::ListArgs),

    /// Parse and register suites without running them
    Validate(validate::ValidateArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match execute(cli).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            std::process::exit(2);
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<bool> {
    let config = match &cli.command {
        Commands::Version => RunnerConfig::default(),
        _ => RunnerConfig::load(&cli.config)?,
    };
    debug!("Configuration ({}): {:?}", cli.config.display(), config);

    match cli.command {
        Commands::Run(args) => run::execute(args, config, cli.format).await,
        Commands::List(args) => list::execute(args, config, cli.format),
        Commands::Validate(args) => validate::execute(args, config, cli.format),
        Commands::Version => {
            println!("suiterun v{}", suiterun_core::VERSION);
            Ok(true)
        }
    }
}
