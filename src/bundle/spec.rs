//! Bundle specs and bundle-list parsing
//!
//! Bundle specs arrive as a JSON array produced by the caller. Every element
//! is validated field by field so the error names the constraint that failed.

use crate::cache::BundleCache;
use crate::error::{OptimizerError, OptimizerResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Dependency every bundle implicitly relies on
pub const DEFAULT_IMPLICIT_DEPENDENCY: &str = "core";

/// Kind of compilation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    Plugin,
    Entry,
}

impl BundleType {
    /// All bundle types, in the order used for error messages
    pub fn all() -> &'static [Self] {
        &[Self::Plugin, Self::Entry]
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "plugin" => Some(Self::Plugin),
            "entry" => Some(Self::Entry),
            _ => None,
        }
    }
}

impl fmt::Display for BundleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plugin => "plugin",
            Self::Entry => "entry",
        };
        write!(f, "{}", name)
    }
}

/// Serializable description of one bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleSpec {
    #[serde(rename = "type")]
    pub bundle_type: BundleType,
    pub id: String,
    pub public_dir_names: Vec<String>,
    pub context_dir: PathBuf,
    pub source_root: PathBuf,
    pub output_dir: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_path: Option<PathBuf>,
}

/// One compilation unit, plus the cache store for its output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    spec: BundleSpec,
    implicit_dependency: String,
    /// Cache record for this bundle's output directory
    pub cache: BundleCache,
}

impl Bundle {
    /// Create a bundle from an already validated spec
    pub fn new(spec: BundleSpec) -> Self {
        Self::with_implicit_dependency(spec, DEFAULT_IMPLICIT_DEPENDENCY)
    }

    /// Create a bundle with a different baseline dependency
    pub fn with_implicit_dependency(spec: BundleSpec, dependency: impl Into<String>) -> Self {
        let cache = BundleCache::new(&spec.output_dir);
        Self {
            spec,
            implicit_dependency: dependency.into(),
            cache,
        }
    }

    pub fn id(&self) -> &str {
        &self.spec.id
    }

    pub fn bundle_type(&self) -> BundleType {
        self.spec.bundle_type
    }

    pub fn public_dir_names(&self) -> &[String] {
        &self.spec.public_dir_names
    }

    pub fn context_dir(&self) -> &Path {
        &self.spec.context_dir
    }

    pub fn source_root(&self) -> &Path {
        &self.spec.source_root
    }

    pub fn output_dir(&self) -> &Path {
        &self.spec.output_dir
    }

    pub fn banner(&self) -> Option<&str> {
        self.spec.banner.as_deref()
    }

    pub fn manifest_path(&self) -> Option<&Path> {
        self.spec.manifest_path.as_deref()
    }

    /// Baseline dependency injected at construction
    pub fn implicit_dependency(&self) -> &str {
        &self.implicit_dependency
    }

    /// Borrow the underlying spec
    pub fn spec(&self) -> &BundleSpec {
        &self.spec
    }

    /// Project the bundle back to its serializable spec
    pub fn to_spec(&self) -> BundleSpec {
        self.spec.clone()
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spec.bundle_type, self.spec.id)
    }
}

/// Parse a JSON array of bundle specs
///
/// Validation stops at the first invalid element. The returned error names
/// the element index and the constraint it violated.
pub fn parse_bundles(json: &str) -> OptimizerResult<Vec<Bundle>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| OptimizerError::invalid_specs(format!("input is not valid JSON: {}", e)))?;

    let elements = value
        .as_array()
        .ok_or_else(|| OptimizerError::invalid_specs("input must be a JSON array"))?;

    elements
        .iter()
        .enumerate()
        .map(|(index, element)| {
            validate_spec(element)
                .map(Bundle::new)
                .map_err(|reason| {
                    OptimizerError::invalid_specs(format!("bundle at index {}: {}", index, reason))
                })
        })
        .collect()
}

fn validate_spec(value: &Value) -> Result<BundleSpec, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "bundle spec must be an object".to_string())?;

    let bundle_type = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(BundleType::from_name)
        .ok_or_else(|| {
            let names: Vec<String> = BundleType::all().iter().map(|t| t.to_string()).collect();
            format!("`type` must be one of [{}]", names.join(", "))
        })?;

    let id = required_string(obj, "id")?;
    let public_dir_names = required_string_array(obj, "publicDirNames")?;
    let context_dir = required_absolute_path(obj, "contextDir")?;
    let source_root = required_absolute_path(obj, "sourceRoot")?;
    let output_dir = required_absolute_path(obj, "outputDir")?;

    if !context_dir.starts_with(&source_root) {
        return Err("`contextDir` must be inside `sourceRoot`".to_string());
    }

    let banner = optional_string(obj, "banner")?;
    let manifest_path = match optional_string(obj, "manifestPath")? {
        Some(path) => Some(absolute_path("manifestPath", path)?),
        None => None,
    };

    Ok(BundleSpec {
        bundle_type,
        id,
        public_dir_names,
        context_dir,
        source_root,
        output_dir,
        banner,
        manifest_path,
    })
}

fn required_string(obj: &Map<String, Value>, key: &str) -> Result<String, String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| format!("`{}` must be a string", key))
}

fn required_string_array(obj: &Map<String, Value>, key: &str) -> Result<Vec<String>, String> {
    let invalid = || format!("`{}` must be an array of strings", key);
    obj.get(key)
        .and_then(Value::as_array)
        .ok_or_else(invalid)?
        .iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn required_absolute_path(obj: &Map<String, Value>, key: &str) -> Result<PathBuf, String> {
    let value = obj
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("`{}` must be an absolute path string", key))?;
    absolute_path(key, value.to_string())
}

fn optional_string(obj: &Map<String, Value>, key: &str) -> Result<Option<String>, String> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(format!("`{}` must be a string when present", key)),
    }
}

fn absolute_path(key: &str, value: String) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(format!("`{}` must be an absolute path", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_spec() -> BundleSpec {
        BundleSpec {
            bundle_type: BundleType::Plugin,
            id: "dashboard".to_string(),
            public_dir_names: vec!["public".to_string(), "common".to_string()],
            context_dir: PathBuf::from("/repo/plugins/dashboard"),
            source_root: PathBuf::from("/repo"),
            output_dir: PathBuf::from("/repo/plugins/dashboard/target/public"),
            banner: Some("/* dashboard */".to_string()),
            manifest_path: Some(PathBuf::from("/repo/plugins/dashboard/plugin.json")),
        }
    }

    fn parse_one(value: Value) -> OptimizerResult<Vec<Bundle>> {
        parse_bundles(&json!([value]).to_string())
    }

    fn error_message(result: OptimizerResult<Vec<Bundle>>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn to_spec_round_trips() {
        let bundle = Bundle::new(sample_spec());
        let json = serde_json::to_string(&[bundle.to_spec()]).unwrap();
        let parsed = parse_bundles(&json).unwrap();

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0], bundle);
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let mut spec = sample_spec();
        spec.banner = None;
        spec.manifest_path = None;

        let value = serde_json::to_value(&spec).unwrap();
        assert!(value.get("banner").is_none());
        assert!(value.get("manifestPath").is_none());
        assert_eq!(value["type"], "plugin");
        assert_eq!(value["publicDirNames"], json!(["public", "common"]));

        let parsed = parse_one(value).unwrap();
        assert_eq!(parsed[0].to_spec(), spec);
    }

    #[test]
    fn bundle_owns_cache_for_output_dir() {
        let bundle = Bundle::new(sample_spec());
        assert!(bundle.cache.path().starts_with(bundle.output_dir()));
        assert_eq!(bundle.implicit_dependency(), DEFAULT_IMPLICIT_DEPENDENCY);
        assert_eq!(bundle.to_string(), "plugin/dashboard");
    }

    #[test]
    fn rejects_invalid_json() {
        let message = error_message(parse_bundles("[{"));
        assert!(message.contains("not valid JSON"));
    }

    #[test]
    fn rejects_non_array() {
        let message = error_message(parse_bundles(r#"{"id": "foo"}"#));
        assert!(message.contains("must be a JSON array"));
    }

    #[test]
    fn rejects_unknown_type() {
        let mut spec = serde_json::to_value(sample_spec()).unwrap();
        spec["type"] = json!("library");
        let message = error_message(parse_one(spec));
        assert!(message.contains("`type` must be one of [plugin, entry]"));
    }

    #[test]
    fn rejects_non_string_public_dir_names() {
        let mut spec = serde_json::to_value(sample_spec()).unwrap();
        spec["publicDirNames"] = json!(["public", 1]);
        let message = error_message(parse_one(spec));
        assert!(message.contains("`publicDirNames` must be an array of strings"));
    }

    #[test]
    fn rejects_relative_paths() {
        let mut spec = serde_json::to_value(sample_spec()).unwrap();
        spec["outputDir"] = json!("target/public");
        let message = error_message(parse_one(spec));
        assert!(message.contains("`outputDir` must be an absolute path"));

        let mut spec = serde_json::to_value(sample_spec()).unwrap();
        spec["manifestPath"] = json!("plugin.json");
        let message = error_message(parse_one(spec));
        assert!(message.contains("`manifestPath` must be an absolute path"));
    }

    #[test]
    fn rejects_non_string_banner() {
        let mut spec = serde_json::to_value(sample_spec()).unwrap();
        spec["banner"] = json!(false);
        let message = error_message(parse_one(spec));
        assert!(message.contains("`banner` must be a string"));
    }

    #[test]
    fn rejects_context_outside_source_root() {
        let mut spec = serde_json::to_value(sample_spec()).unwrap();
        spec["contextDir"] = json!("/elsewhere/plugin");
        let message = error_message(parse_one(spec));
        assert!(message.contains("`contextDir` must be inside `sourceRoot`"));
    }

    #[test]
    fn reports_index_of_first_invalid_element() {
        let good = serde_json::to_value(sample_spec()).unwrap();
        let mut bad = good.clone();
        bad["id"] = json!(42);
        let mut also_bad = good.clone();
        also_bad["type"] = json!("nope");

        let message = error_message(parse_bundles(&json!([good, bad, also_bad]).to_string()));
        assert!(message.contains("bundle at index 1"));
        assert!(message.contains("`id` must be a string"));
    }
}
