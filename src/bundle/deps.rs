//! Bundle dependency manifests
//!
//! A bundle may point at a JSON manifest declaring the bundles and plugins it
//! requires. Bundles without a manifest only depend on the implicit baseline.

use crate::bundle::spec::Bundle;
use crate::error::{OptimizerError, OptimizerResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Dependencies resolved from a bundle's manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDependencies {
    /// Baseline dependency followed by required plugins
    pub implicit: Vec<String>,
    /// Bundles this bundle imports from explicitly
    pub explicit: Vec<String>,
}

impl BundleDependencies {
    /// Whether `bundle_id` is declared, implicitly or explicitly
    pub fn includes(&self, bundle_id: &str) -> bool {
        self.implicit.iter().chain(&self.explicit).any(|id| id == bundle_id)
    }
}

impl Bundle {
    /// Read the bundle's manifest and resolve its dependencies
    ///
    /// A manifest path that does not exist on disk reads as an empty object.
    /// Every other read failure is returned to the caller.
    pub fn read_bundle_deps(&self) -> OptimizerResult<BundleDependencies> {
        let baseline = self.implicit_dependency().to_string();

        let Some(path) = self.manifest_path() else {
            return Ok(BundleDependencies {
                implicit: vec![baseline],
                explicit: vec![],
            });
        };

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Manifest {} not found, using defaults", path.display());
                "{}".to_string()
            }
            Err(e) => {
                return Err(OptimizerError::io(
                    format!("reading manifest {}", path.display()),
                    e,
                ))
            }
        };

        parse_manifest(path, &content, baseline)
    }
}

fn parse_manifest(
    path: &Path,
    content: &str,
    baseline: String,
) -> OptimizerResult<BundleDependencies> {
    let value: Value =
        serde_json::from_str(content).map_err(|source| OptimizerError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })?;

    let obj = value
        .as_object()
        .ok_or_else(|| OptimizerError::ManifestInvalid {
            path: path.to_path_buf(),
            reason: "manifest must be a JSON object".to_string(),
        })?;

    let required_bundles = string_array(path, obj, "requiredBundles")?;
    let required_plugins = string_array(path, obj, "requiredPlugins")?;

    let mut implicit = vec![baseline];
    for plugin in required_plugins.unwrap_or_default() {
        if !implicit.contains(&plugin) {
            implicit.push(plugin);
        }
    }

    Ok(BundleDependencies {
        implicit,
        explicit: required_bundles.unwrap_or_default(),
    })
}

fn string_array(
    path: &Path,
    obj: &Map<String, Value>,
    key: &str,
) -> OptimizerResult<Option<Vec<String>>> {
    let Some(value) = obj.get(key) else {
        return Ok(None);
    };

    let invalid = || OptimizerError::ManifestInvalid {
        path: path.to_path_buf(),
        reason: format!("`{}` must be an array of strings", key),
    };

    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect::<OptimizerResult<Vec<_>>>()
        .map(Some)
}
