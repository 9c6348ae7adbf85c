//! Bundle Optimizer
//!
//! CLI entry point that dispatches to subcommands.

use bundle_optimizer::cli::{Cli, Commands};
use bundle_optimizer::config::ConfigManager;
use bundle_optimizer::error::{OptimizerError, OptimizerResult};
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> OptimizerResult<()> {
    let cli = Cli::parse();

    // Initialize logging: 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("bundle_optimizer=warn"),
        1 => EnvFilter::new("bundle_optimizer=info"),
        _ => EnvFilter::new("bundle_optimizer=debug"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    // Find local config unless --no-local is set
    let local_config_path = if cli.no_local {
        debug!("Local config discovery disabled (--no-local)");
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| OptimizerError::io("getting current directory", e))?;
        let found = ConfigManager::find_local_config(&cwd);
        if let Some(ref path) = found {
            debug!("Found local config: {}", path.display());
        }
        found
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    match cli.command {
        Commands::Build(args) => bundle_optimizer::cli::commands::build(args, &config).await,
        Commands::Cache(args) => bundle_optimizer::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            bundle_optimizer::cli::commands::config(args, &config_manager, &config).await
        }
    }
}
