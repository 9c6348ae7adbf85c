//! CLI command implementations

pub mod build;
pub mod cache;
pub mod config;

pub use build::execute as build;
pub use cache::execute as cache;
pub use config::execute as config;

use crate::bundle::{parse_bundles, Bundle, BundleRefs};
use crate::cache::{get_cache_decisions, CacheDecision};
use crate::config::WorkerConfig;
use crate::error::{OptimizerError, OptimizerResult};
use console::style;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Read and validate the bundle list at `path`
pub(crate) async fn load_bundles(path: &Path) -> OptimizerResult<Vec<Arc<Bundle>>> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| OptimizerError::io(format!("reading bundles from {}", path.display()), e))?;

    let bundles = parse_bundles(&content)?;
    debug!("Loaded {} bundles from {}", bundles.len(), path.display());
    Ok(bundles.into_iter().map(Arc::new).collect())
}

/// Cache decision for every bundle, computed on the blocking pool
///
/// Deciding hashes every file a bundle's record references.
pub(crate) async fn decide_all(
    bundles: &[Arc<Bundle>],
    worker: &WorkerConfig,
    bundle_refs: &BundleRefs,
) -> OptimizerResult<Vec<(Arc<Bundle>, CacheDecision)>> {
    let bundles = bundles.to_vec();
    let worker = worker.clone();
    let bundle_refs = bundle_refs.clone();

    tokio::task::spawn_blocking(move || get_cache_decisions(&bundles, &worker, &bundle_refs))
        .await
        .map_err(|e| OptimizerError::Internal(format!("cache decision task failed: {}", e)))
}

/// Worker config with a CLI cache key override applied
pub(crate) fn with_cache_key(worker: &WorkerConfig, key: Option<String>) -> WorkerConfig {
    let mut worker = worker.clone();
    if key.is_some() {
        worker.optimizer_cache_key = key;
    }
    worker
}

/// Cache decision as reported on the command line
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DecisionReport {
    bundle_id: String,
    bundle_type: String,
    cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<String>,
}

impl DecisionReport {
    pub(crate) fn new(bundle: &Bundle, decision: &CacheDecision) -> Self {
        Self {
            bundle_id: bundle.id().to_string(),
            bundle_type: bundle.bundle_type().to_string(),
            cached: decision.is_cached(),
            reason: decision.reason().map(|r| r.to_string()),
            diff: decision.diff().map(str::to_string),
        }
    }

    pub(crate) fn is_cached(&self) -> bool {
        self.cached
    }

    pub(crate) fn print_text(&self) {
        let state = if self.cached {
            style("cached").green().to_string()
        } else {
            style("not cached").yellow().to_string()
        };
        let name = format!("{}/{}", self.bundle_type, self.bundle_id);

        match self.reason {
            Some(ref reason) => println!("{:<40} {} ({})", name, state, reason),
            None => println!("{:<40} {}", name, state),
        }

        if let Some(ref diff) = self.diff {
            debug!("{} cache diff:\n{}", name, diff);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::NotCachedReason;

    fn write_bundles(dir: &Path, json: &str) -> std::path::PathBuf {
        let path = dir.join("bundles.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[tokio::test]
    async fn load_bundles_reads_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let json = serde_json::json!([{
            "type": "plugin",
            "id": "foo",
            "publicDirNames": ["public"],
            "contextDir": temp.path().join("foo"),
            "sourceRoot": temp.path(),
            "outputDir": temp.path().join("foo").join("target"),
        }]);
        let path = write_bundles(temp.path(), &json.to_string());

        let bundles = load_bundles(&path).await.unwrap();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].id(), "foo");
    }

    #[tokio::test]
    async fn load_bundles_missing_file_is_io_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let err = load_bundles(&temp.path().join("nope.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, OptimizerError::Io { .. }));
    }

    #[tokio::test]
    async fn decide_all_keeps_bundle_order() {
        let temp = tempfile::TempDir::new().unwrap();
        let specs: Vec<serde_json::Value> = ["foo", "bar"]
            .iter()
            .map(|id| {
                serde_json::json!({
                    "type": "plugin",
                    "id": id,
                    "publicDirNames": ["public"],
                    "contextDir": temp.path().join(id),
                    "sourceRoot": temp.path(),
                    "outputDir": temp.path().join(id).join("target"),
                })
            })
            .collect();
        let json = serde_json::Value::Array(specs);
        let path = write_bundles(temp.path(), &json.to_string());
        let bundles = load_bundles(&path).await.unwrap();
        let refs = BundleRefs::from_bundles(bundles.iter().map(Arc::as_ref));

        let decisions = decide_all(&bundles, &WorkerConfig::default(), &refs)
            .await
            .unwrap();

        let ids: Vec<&str> = decisions.iter().map(|(b, _)| b.id()).collect();
        assert_eq!(ids, vec!["foo", "bar"]);
        assert_eq!(
            decisions[0].1.reason(),
            Some(NotCachedReason::MissingOptimizerCacheKey)
        );
    }

    #[test]
    fn cache_key_override_only_when_given() {
        let worker = WorkerConfig {
            optimizer_cache_key: Some("config".to_string()),
            ..WorkerConfig::default()
        };

        assert_eq!(
            with_cache_key(&worker, None).optimizer_cache_key.as_deref(),
            Some("config")
        );
        assert_eq!(
            with_cache_key(&worker, Some("cli".to_string()))
                .optimizer_cache_key
                .as_deref(),
            Some("cli")
        );
    }

    #[test]
    fn report_serializes_reason_and_diff() {
        let bundle = Bundle::new(crate::bundle::BundleSpec {
            bundle_type: crate::bundle::BundleType::Entry,
            id: "core".to_string(),
            public_dir_names: vec![],
            context_dir: "/repo/src/core".into(),
            source_root: "/repo".into(),
            output_dir: "/repo/target/core".into(),
            banner: None,
            manifest_path: None,
        });
        let decision = CacheDecision::NotCached {
            reason: NotCachedReason::OptimizerCacheKeyMismatch,
            diff: Some("-a\n+b\n".to_string()),
        };

        let value = serde_json::to_value(DecisionReport::new(&bundle, &decision)).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "bundleId": "core",
                "bundleType": "entry",
                "cached": false,
                "reason": "optimizer cache key mismatch",
                "diff": "-a\n+b\n",
            })
        );
    }
}
