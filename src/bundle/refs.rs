//! Cross-bundle reference table
//!
//! Every public directory of every bundle is an export surface other bundles
//! may import from. The compiler replaces such imports with reference
//! modules carrying the export id, which ends up in the cache record.

use crate::bundle::spec::Bundle;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One importable public directory of a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRef {
    pub bundle_id: String,
    pub context_dir: PathBuf,
    pub entry: String,
    pub export_id: String,
}

impl BundleRef {
    /// Directory whose contents are reached through this reference
    pub fn entry_dir(&self) -> PathBuf {
        self.context_dir.join(&self.entry)
    }
}

/// All export surfaces known to a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleRefs {
    refs: Vec<BundleRef>,
}

impl BundleRefs {
    /// Collect the export surfaces of `bundles`
    pub fn from_bundles<'a>(bundles: impl IntoIterator<Item = &'a Bundle>) -> Self {
        let refs = bundles
            .into_iter()
            .flat_map(|bundle| {
                bundle.public_dir_names().iter().map(move |entry| BundleRef {
                    bundle_id: bundle.id().to_string(),
                    context_dir: bundle.context_dir().to_path_buf(),
                    entry: entry.clone(),
                    export_id: format!("{}/{}/{}", bundle.bundle_type(), bundle.id(), entry),
                })
            })
            .collect();

        Self { refs }
    }

    pub fn all(&self) -> &[BundleRef] {
        &self.refs
    }

    pub fn is_empty(&self) -> bool {
        self.refs.is_empty()
    }

    /// References whose export id appears in `export_ids`
    pub fn filter_by_export_ids(&self, export_ids: &[String]) -> Vec<&BundleRef> {
        self.refs
            .iter()
            .filter(|r| export_ids.contains(&r.export_id))
            .collect()
    }

    /// Reference with the given export id
    pub fn find_export(&self, export_id: &str) -> Option<&BundleRef> {
        self.refs.iter().find(|r| r.export_id == export_id)
    }

    /// Sorted export ids from `cached` that still exist in this table
    pub fn current_export_ids(&self, cached: &[String]) -> Vec<String> {
        let mut ids: Vec<String> = self
            .filter_by_export_ids(cached)
            .into_iter()
            .map(|r| r.export_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Find the reference another bundle would import `path` through
    ///
    /// References owned by `importer` are skipped: a bundle never imports
    /// its own public directories through a reference.
    pub fn resolve(&self, importer: &Bundle, path: &Path) -> Option<&BundleRef> {
        self.refs
            .iter()
            .filter(|r| r.bundle_id != importer.id())
            .find(|r| path.starts_with(r.entry_dir()))
    }
}
