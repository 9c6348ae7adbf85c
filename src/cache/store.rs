//! Per-bundle cache record persistence
//!
//! Each bundle keeps one JSON record beneath its output directory describing
//! the last successful build. Reading is fail-safe: a missing or corrupt
//! record reads as empty, which every caller treats as "not cached".

use crate::bundle::CacheKey;
use crate::error::{OptimizerError, OptimizerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the record inside a bundle's output directory
pub const CACHE_FILE_NAME: &str = ".optimizer-cache";

/// Fingerprint of a bundle's last successful build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<CacheKey>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimizer_cache_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_units: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_ref_export_ids: Option<Vec<String>>,
}

impl CacheRecord {
    /// Whether no field is populated
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// File-backed cache record for one output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleCache {
    path: PathBuf,
}

impl BundleCache {
    /// Create the store for a bundle output directory
    pub fn new(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(CACHE_FILE_NAME),
        }
    }

    /// Get the record file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the record, or an empty one if it is missing or unreadable
    pub fn get(&self) -> CacheRecord {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    debug!("Unable to read cache {}: {}", self.path.display(), e);
                }
                return CacheRecord::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!("Ignoring corrupt cache {}: {}", self.path.display(), e);
            CacheRecord::default()
        })
    }

    /// Persist the record, replacing any previous one
    pub fn set(&self, record: &CacheRecord) -> OptimizerResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                OptimizerError::io(format!("creating cache directory {}", parent.display()), e)
            })?;
        }

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, content).map_err(|e| {
            OptimizerError::io(format!("writing cache {}", self.path.display()), e)
        })?;

        debug!("Wrote cache {}", self.path.display());
        Ok(())
    }

    /// Delete the record
    pub fn clear(&self) -> OptimizerResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(OptimizerError::io(
                format!("deleting cache {}", self.path.display()),
                e,
            )),
        }
    }

    pub fn cache_key(&self) -> Option<CacheKey> {
        self.get().cache_key
    }

    pub fn optimizer_cache_key(&self) -> Option<String> {
        self.get().optimizer_cache_key
    }

    pub fn referenced_files(&self) -> Option<Vec<PathBuf>> {
        self.get().files
    }

    pub fn module_count(&self) -> Option<usize> {
        self.get().module_count
    }

    pub fn work_units(&self) -> Option<usize> {
        self.get().work_units
    }

    pub fn bundle_ref_export_ids(&self) -> Option<Vec<String>> {
        self.get().bundle_ref_export_ids
    }
}
