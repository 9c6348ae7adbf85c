//! Structural cache keys

use crate::bundle::spec::{Bundle, BundleSpec};
use crate::cache::FileHashes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Fingerprint of a bundle spec plus the content hash of every file it references
///
/// `hashes` is ordered by path so two keys built from the same inputs compare
/// equal no matter how the hash table was populated. A file without a hash
/// keeps a `None` entry, so a deleted file still changes the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheKey {
    pub spec: BundleSpec,
    pub hashes: BTreeMap<PathBuf, Option<String>>,
}

impl Bundle {
    /// Build the cache key for `files` using the hashes looked up in `hashes`
    pub fn create_cache_key(&self, files: &[PathBuf], hashes: &FileHashes) -> CacheKey {
        let hashes = files
            .iter()
            .map(|path| (path.clone(), hashes.get(path).cloned().flatten()))
            .collect();

        CacheKey {
            spec: self.to_spec(),
            hashes,
        }
    }
}
