//! Configuration schema for the bundle optimizer
//!
//! Configuration is stored at `~/.config/bundle-optimizer/config.toml`, or in
//! a project-local `.optimizer.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker behaviour shared by the cache and the orchestrator
    pub worker: WorkerConfig,

    /// Underlying bundler process
    pub compiler: CompilerConfig,
}

/// Worker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Keep compiling on file changes
    pub watch: bool,

    /// Write per-bundle `stats.json` diagnostics
    pub profile_webpack: bool,

    /// Build-wide key; changing it invalidates every bundle cache
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizer_cache_key: Option<String>,

    /// Reuse cached bundles (default: true)
    pub cache: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            watch: false,
            profile_webpack: false,
            optimizer_cache_key: None,
            cache: true,
        }
    }
}

/// Bundler process configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Program to launch
    pub command: String,

    /// Arguments passed to the program
    pub args: Vec<String>,

    /// Working directory (defaults to the current directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables
    pub env: HashMap<String, String>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            command: "node".to_string(),
            args: vec!["scripts/bundler_worker.js".to_string()],
            cwd: None,
            env: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[worker]"));
        assert!(toml.contains("[compiler]"));
        assert!(!toml.contains("optimizer_cache_key"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.worker.cache);
        assert!(!config.worker.watch);
        assert_eq!(config.compiler.command, "node");
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [worker]
            optimizer_cache_key = "v42"
            cache = false
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.worker.optimizer_cache_key.as_deref(), Some("v42"));
        assert!(!config.worker.cache);
        assert!(!config.worker.profile_webpack); // default preserved
        assert_eq!(config.compiler.args, vec!["scripts/bundler_worker.js"]);
    }
}
