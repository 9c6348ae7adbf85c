//! Module graph classification
//!
//! After a successful pass every module the bundler touched is accounted
//! for: counted, mapped to the files whose hashes make up the next cache key,
//! or recorded as a cross-bundle reference. An unrecognised module kind is an
//! error because it would leave the file set incomplete.

use crate::bundle::{Bundle, BundleDependencies, BundleRefs};
use crate::error::{OptimizerError, OptimizerResult};
use crate::orchestration::compiler::{BundlerModule, PassStats};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

/// Extra scheduling weight of a stylesheet module
pub const EXTRA_STYLESHEET_WORK_UNITS: usize = 100;

const DEPENDENCY_DIR: &str = "node_modules";
const STYLESHEET_EXTENSION: &str = "scss";

/// Facts harvested from one successful pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub module_count: usize,
    pub work_units: usize,
    /// Sorted, deduplicated
    pub referenced_files: Vec<PathBuf>,
    /// Sorted, deduplicated
    pub bundle_ref_export_ids: Vec<String>,
}

/// Classify the modules of a successful pass for `bundle`
pub fn summarize_pass(bundle: &Bundle, stats: &PassStats) -> OptimizerResult<PassSummary> {
    let mut module_count = 0;
    let mut work_units = stats.file_dependencies.len();
    let mut referenced_files = BTreeSet::new();
    let mut export_ids = BTreeSet::new();

    if let Some(manifest) = bundle.manifest_path() {
        referenced_files.insert(manifest.to_path_buf());
    }

    for (index, module) in stats.modules.iter().enumerate() {
        match module {
            BundlerModule::Normal {
                resource,
                file_dependencies,
            } => {
                module_count += 1;
                let path = module_path(resource);

                match dependency_manifest_path(&path) {
                    Some(package_json) => {
                        referenced_files.insert(package_json);
                    }
                    None => {
                        if is_stylesheet(&path) {
                            work_units += EXTRA_STYLESHEET_WORK_UNITS;
                            referenced_files.extend(file_dependencies.iter().cloned());
                        }
                        referenced_files.insert(path);
                    }
                }
            }
            BundlerModule::BundleRef { export_id } => {
                export_ids.insert(export_id.clone());
            }
            BundlerModule::Concatenated {
                module_count: subsumed,
            } => {
                module_count += subsumed;
            }
            BundlerModule::External { .. } | BundlerModule::Ignored => {}
            BundlerModule::Unknown => {
                return Err(OptimizerError::UnexpectedModule {
                    bundle_id: bundle.id().to_string(),
                    detail: format!("module #{} has an unrecognised kind", index),
                });
            }
        }
    }

    Ok(PassSummary {
        module_count,
        work_units,
        referenced_files: referenced_files.into_iter().collect(),
        bundle_ref_export_ids: export_ids.into_iter().collect(),
    })
}

/// Cross-bundle imports of `bundle` whose owner it does not declare
///
/// Both reference modules and plain modules loaded from another bundle's
/// public directory count as imports of that bundle. One message per export
/// surface, sorted by export id.
pub fn undeclared_imports(
    bundle: &Bundle,
    deps: &BundleDependencies,
    refs: &BundleRefs,
    stats: &PassStats,
) -> Vec<String> {
    let mut undeclared = BTreeSet::new();

    for module in &stats.modules {
        let target = match module {
            BundlerModule::BundleRef { export_id } => refs.find_export(export_id),
            BundlerModule::Normal { resource, .. } => refs.resolve(bundle, &module_path(resource)),
            _ => None,
        };

        if let Some(target) = target {
            if target.bundle_id != bundle.id() && !deps.includes(&target.bundle_id) {
                undeclared.insert((target.export_id.clone(), target.bundle_id.clone()));
            }
        }
    }

    undeclared
        .into_iter()
        .map(|(export_id, owner)| {
            format!(
                "{} imports {}, but bundle \"{}\" is not listed in requiredBundles or requiredPlugins",
                bundle.id(),
                export_id,
                owner
            )
        })
        .collect()
}

/// Strip a loader query from a module resource
fn module_path(resource: &str) -> PathBuf {
    let path = resource.split_once('?').map_or(resource, |(path, _)| path);
    PathBuf::from(path)
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension() == Some(OsStr::new(STYLESHEET_EXTENSION))
}

/// Manifest of the package `path` belongs to, if it lives in a dependency directory
///
/// The innermost dependency directory wins. Scoped packages (`@scope/name`)
/// take one more path segment than unscoped ones. A loose file sitting
/// directly in the dependency directory (or in a scope directory) belongs to
/// no package and stands for itself.
pub fn dependency_manifest_path(path: &Path) -> Option<PathBuf> {
    let components: Vec<Component<'_>> = path.components().collect();
    let dep_index = components
        .iter()
        .rposition(|c| c.as_os_str() == OsStr::new(DEPENDENCY_DIR))?;

    let package_name = components.get(dep_index + 1)?;
    let is_scoped = package_name
        .as_os_str()
        .to_str()
        .is_some_and(|name| name.starts_with('@'));
    let package_len = if is_scoped { 2 } else { 1 };

    let package_end = dep_index + 1 + package_len;
    if package_end >= components.len() {
        return Some(path.to_path_buf());
    }

    let mut manifest: PathBuf = components[..package_end].iter().collect();
    manifest.push("package.json");
    Some(manifest)
}
