//! Content hashing for referenced files
//!
//! Cache keys are built from the SHA256 of every file a bundle referenced
//! during its last build. Same contents = same hash.

use crate::error::{OptimizerError, OptimizerResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Content hash per file; `None` when the file could not be read
pub type FileHashes = HashMap<PathBuf, Option<String>>;

/// Hash a file's contents using SHA256, returning the hex digest
pub fn hash_file(path: &Path) -> OptimizerResult<String> {
    let contents = fs::read(path).map_err(|e| OptimizerError::Io {
        context: format!("reading referenced file {}", path.display()),
        source: e,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&contents);
    Ok(hex::encode(hasher.finalize()))
}

/// Hash every path in `paths`
///
/// Unreadable files map to `None` rather than failing, so a deleted file
/// shows up as a changed cache key instead of an error.
pub fn get_hashes(paths: &[PathBuf]) -> FileHashes {
    let hashes: FileHashes = paths
        .iter()
        .map(|path| {
            let hash = match hash_file(path) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    debug!("No hash for {}: {}", path.display(), e);
                    None
                }
            };
            (path.clone(), hash)
        })
        .collect();

    debug!("Hashed {} referenced files", hashes.len());
    hashes
}
