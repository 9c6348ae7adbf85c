//! Error types for the bundle optimizer
//!
//! All modules use `OptimizerResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for optimizer operations
pub type OptimizerResult<T> = Result<T, OptimizerError>;

/// All errors that can occur in the optimizer
#[derive(Error, Debug)]
pub enum OptimizerError {
    // Validation errors
    #[error("Invalid bundle specs: {reason}")]
    BundleSpecsInvalid { reason: String },

    #[error("Unable to parse manifest at {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid manifest at {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Compilation errors
    #[error("Unexpected module type in bundle {bundle_id}: {detail}")]
    UnexpectedModule { bundle_id: String, detail: String },

    #[error("Compiler exited with code {code}: {output}")]
    CompilerExited { code: i32, output: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl OptimizerError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a bundle spec validation error
    pub fn invalid_specs(reason: impl Into<String>) -> Self {
        Self::BundleSpecsInvalid {
            reason: reason.into(),
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::BundleSpecsInvalid { .. } => {
                Some("The bundle list must be a JSON array of bundle specs")
            }
            Self::ManifestInvalid { .. } => {
                Some("requiredBundles and requiredPlugins must be arrays of strings")
            }
            Self::CommandFailed { .. } => Some("Check [compiler] command in the config file"),
            Self::UnexpectedModule { .. } => {
                Some("The compiler reported a module kind this worker does not understand")
            }
            _ => None,
        }
    }
}
