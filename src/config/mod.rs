//! Configuration management for the bundle optimizer

pub mod schema;

pub use schema::{CompilerConfig, Config, WorkerConfig};

use crate::error::{OptimizerError, OptimizerResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// File name of project-local configuration
pub const LOCAL_CONFIG_NAME: &str = ".optimizer.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bundle-optimizer")
            .join("config.toml")
    }

    /// Find the nearest project-local config, walking up from `start`
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, falling back to defaults if the file is missing
    pub async fn load(&self) -> OptimizerResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> OptimizerResult<Config> {
        let value = Self::read_table(path).await?;
        Self::from_table(value, path)
    }

    /// Load configuration with a project-local file layered on top
    ///
    /// Tables merge key by key; any other value in the local file replaces
    /// the global one.
    pub async fn load_merged(&self, local: Option<&Path>) -> OptimizerResult<Config> {
        let Some(local) = local else {
            return self.load().await;
        };

        let mut merged = if self.config_path.exists() {
            Self::read_table(&self.config_path).await?
        } else {
            toml::Table::new()
        };

        merge_tables(&mut merged, Self::read_table(local).await?);
        debug!("Merged local config from {}", local.display());
        Self::from_table(merged, local)
    }

    async fn read_table(path: &Path) -> OptimizerResult<toml::Table> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            OptimizerError::io(format!("reading config from {}", path.display()), e)
        })?;

        content
            .parse::<toml::Table>()
            .map_err(|e| OptimizerError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn from_table(table: toml::Table, path: &Path) -> OptimizerResult<Config> {
        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| OptimizerError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> OptimizerResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            OptimizerError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> OptimizerResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| OptimizerError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let toml::Value::Table(incoming) = value else {
            base.insert(key, value);
            continue;
        };

        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
