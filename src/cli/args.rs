//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Bundle Optimizer - incremental multi-bundle builds
///
/// Skips bundles whose inputs are unchanged since their last successful
/// build and compiles the rest in one bundler run.
#[derive(Parser, Debug)]
#[command(name = "bundle-optimizer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "BUNDLE_OPTIMIZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Skip local .optimizer.toml discovery
    #[arg(long, global = true)]
    pub no_local: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build every bundle that is not cached
    Build(BuildArgs),

    /// Inspect or clear bundle caches
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// JSON file with the bundle list
    #[arg(short, long)]
    pub bundles: PathBuf,

    /// Keep compiling on file changes
    #[arg(short, long)]
    pub watch: bool,

    /// Ignore bundle caches for this build
    #[arg(long)]
    pub no_cache: bool,

    /// Write per-bundle stats.json diagnostics
    #[arg(long)]
    pub profile: bool,

    /// Build-wide cache key (overrides config)
    #[arg(long, env = "BUNDLE_OPTIMIZER_CACHE_KEY")]
    pub optimizer_cache_key: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for reports and events
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show the cache decision for each bundle
    Status {
        /// JSON file with the bundle list
        #[arg(short, long)]
        bundles: PathBuf,

        /// Build-wide cache key (overrides config)
        #[arg(long, env = "BUNDLE_OPTIMIZER_CACHE_KEY")]
        optimizer_cache_key: Option<String>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Delete the cache record of each bundle
    Clear {
        /// JSON file with the bundle list
        #[arg(short, long)]
        bundles: PathBuf,
    },
}
