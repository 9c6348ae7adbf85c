//! Cache hit/miss decisions
//!
//! Checks run from cheapest to most expensive. The final check re-hashes
//! every file referenced by the previous build, so anything that can be
//! decided from the record alone is decided first.

use crate::bundle::{Bundle, BundleRefs};
use crate::cache::diff::diff_values;
use crate::cache::hash::get_hashes;
use crate::config::WorkerConfig;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Why a bundle has to be rebuilt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotCachedReason {
    CacheDisabled,
    MissingOptimizerCacheKey,
    OptimizerCacheKeyMismatch,
    BundleRefsOutdated,
    MissingCacheKey,
    CacheKeyMismatch,
}

impl fmt::Display for NotCachedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::CacheDisabled => "cache disabled",
            Self::MissingOptimizerCacheKey => "optimizer cache key is missing",
            Self::OptimizerCacheKeyMismatch => "optimizer cache key mismatch",
            Self::BundleRefsOutdated => "bundle references outdated",
            Self::MissingCacheKey => "bundle cache key is missing",
            Self::CacheKeyMismatch => "cache key mismatch",
        };
        write!(f, "{}", text)
    }
}

/// Outcome of comparing a bundle against its cache record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheDecision {
    Cached,
    NotCached {
        reason: NotCachedReason,
        /// Unified diff of the cached and current values, when they were compared
        diff: Option<String>,
    },
}

impl CacheDecision {
    fn miss(reason: NotCachedReason) -> Self {
        Self::NotCached { reason, diff: None }
    }

    fn miss_with_diff(reason: NotCachedReason, diff: String) -> Self {
        Self::NotCached {
            reason,
            diff: Some(diff),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, Self::Cached)
    }

    pub fn reason(&self) -> Option<NotCachedReason> {
        match self {
            Self::Cached => None,
            Self::NotCached { reason, .. } => Some(*reason),
        }
    }

    pub fn diff(&self) -> Option<&str> {
        match self {
            Self::Cached => None,
            Self::NotCached { diff, .. } => diff.as_deref(),
        }
    }
}

impl fmt::Display for CacheDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cached => write!(f, "cached"),
            Self::NotCached { reason, .. } => write!(f, "not cached: {}", reason),
        }
    }
}

/// Decide whether `bundle` can be reused from its cache record
///
/// `current_ref_export_ids` are the cross-bundle export ids the bundle's
/// previous imports resolve to in the current build.
pub fn get_cache_decision(
    bundle: &Bundle,
    config: &WorkerConfig,
    current_ref_export_ids: &[String],
) -> CacheDecision {
    if !config.cache {
        return CacheDecision::miss(NotCachedReason::CacheDisabled);
    }

    let Some(optimizer_cache_key) = config.optimizer_cache_key.as_deref() else {
        return CacheDecision::miss(NotCachedReason::MissingOptimizerCacheKey);
    };

    let record = bundle.cache.get();

    if record.optimizer_cache_key.as_deref() != Some(optimizer_cache_key) {
        let diff = diff_values(&record.optimizer_cache_key, optimizer_cache_key)
            .unwrap_or_default();
        return CacheDecision::miss_with_diff(NotCachedReason::OptimizerCacheKeyMismatch, diff);
    }

    let cached_ids = sorted_set(record.bundle_ref_export_ids.as_deref().unwrap_or_default());
    let current_ids = sorted_set(current_ref_export_ids);
    if cached_ids != current_ids {
        let diff = diff_values(&cached_ids, &current_ids).unwrap_or_default();
        return CacheDecision::miss_with_diff(NotCachedReason::BundleRefsOutdated, diff);
    }

    let Some(cached_key) = record.cache_key else {
        return CacheDecision::miss(NotCachedReason::MissingCacheKey);
    };

    let files = record.files.unwrap_or_default();
    let hashes = get_hashes(&files);
    let current_key = bundle.create_cache_key(&files, &hashes);

    if cached_key != current_key {
        let diff = diff_values(&cached_key, &current_key).unwrap_or_default();
        return CacheDecision::miss_with_diff(NotCachedReason::CacheKeyMismatch, diff);
    }

    CacheDecision::Cached
}

/// Decide every bundle against the current reference table
pub fn get_cache_decisions(
    bundles: &[Arc<Bundle>],
    config: &WorkerConfig,
    bundle_refs: &BundleRefs,
) -> Vec<(Arc<Bundle>, CacheDecision)> {
    bundles
        .iter()
        .map(|bundle| {
            let cached_ids = bundle.cache.bundle_ref_export_ids().unwrap_or_default();
            let current_ids = bundle_refs.current_export_ids(&cached_ids);
            let decision = get_cache_decision(bundle, config, &current_ids);

            match decision.diff() {
                Some(diff) => debug!("{}: {}\n{}", bundle, decision, diff),
                None => debug!("{}: {}", bundle, decision),
            }

            (Arc::clone(bundle), decision)
        })
        .collect()
}

fn sorted_set(ids: &[String]) -> Vec<String> {
    let mut ids = ids.to_vec();
    ids.sort();
    ids.dedup();
    ids
}
