//! Underlying bundler abstraction
//!
//! The bundler itself is opaque. It compiles every bundle of a job in one
//! multi-target run and reports lifecycle hooks per bundle; the orchestrator
//! turns those hooks into compiler events.

use crate::bundle::{Bundle, BundleDependencies, BundleRef, BundleRefs, BundleSpec};
use crate::error::OptimizerResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Work handed to the bundler for one orchestration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerJob {
    pub bundles: Vec<BundleSpec>,
    /// Declared dependencies, keyed by bundle id
    pub dependencies: BTreeMap<String, BundleDependencies>,
    pub bundle_refs: Vec<BundleRef>,
    pub watch: bool,
}

impl CompilerJob {
    pub fn new<'a>(
        bundles: impl IntoIterator<Item = (&'a Bundle, &'a BundleDependencies)>,
        bundle_refs: &BundleRefs,
        watch: bool,
    ) -> Self {
        let mut specs = Vec::new();
        let mut dependencies = BTreeMap::new();
        for (bundle, deps) in bundles {
            specs.push(bundle.to_spec());
            dependencies.insert(bundle.id().to_string(), deps.clone());
        }

        Self {
            bundles: specs,
            dependencies,
            bundle_refs: bundle_refs.all().to_vec(),
            watch,
        }
    }
}

/// A module the bundler touched during a pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BundlerModule {
    /// A file loaded from disk, possibly from a dependency package
    #[serde(rename_all = "camelCase")]
    Normal {
        /// Absolute path, optionally followed by a `?query`
        resource: String,
        /// Files the module's loaders read while building it
        #[serde(default)]
        file_dependencies: Vec<PathBuf>,
    },
    /// Import of another bundle's public export surface
    #[serde(rename_all = "camelCase")]
    BundleRef { export_id: String },
    /// Several modules concatenated into one scope
    #[serde(rename_all = "camelCase")]
    Concatenated { module_count: usize },
    /// Provided at runtime, not bundled
    External {
        #[serde(default)]
        request: String,
    },
    /// Replaced with an empty module
    Ignored,
    /// Any kind this worker does not know how to account for
    #[serde(other)]
    Unknown,
}

/// Result of one compile pass for one bundle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassStats {
    /// The bundler will run another pass before this one counts
    pub needs_additional_pass: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub modules: Vec<BundlerModule>,
    /// Every file the pass read
    pub file_dependencies: Vec<PathBuf>,
}

/// Lifecycle notification from the bundler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hook", rename_all = "camelCase")]
pub enum CompilerHook {
    /// A pass started (first run, or a watch re-trigger)
    #[serde(rename_all = "camelCase")]
    Run { bundle_id: String },
    /// A pass completed, successfully or with compile errors
    #[serde(rename_all = "camelCase")]
    Done { bundle_id: String, stats: PassStats },
    /// The pass could not run at all
    #[serde(rename_all = "camelCase")]
    Failed { bundle_id: String, message: String },
}

impl CompilerHook {
    pub fn bundle_id(&self) -> &str {
        match self {
            Self::Run { bundle_id } | Self::Done { bundle_id, .. } | Self::Failed { bundle_id, .. } => {
                bundle_id
            }
        }
    }
}

/// Multi-target bundler driven by the orchestrator
///
/// Implementations send hooks until the job is finished (or forever in
/// watch mode) and must return promptly once `cancel` fires. Returning an
/// error means the bundler itself failed; every bundle still in flight is
/// reported as errored.
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Run the job, reporting lifecycle hooks on `hooks`
    async fn run(
        &self,
        job: CompilerJob,
        hooks: mpsc::Sender<CompilerHook>,
        cancel: CancellationToken,
    ) -> OptimizerResult<()>;

    /// Human-readable compiler name for logs
    fn name(&self) -> &'static str;
}
