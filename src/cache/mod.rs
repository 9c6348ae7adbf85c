//! Incremental bundle cache
//!
//! Each bundle records the fingerprint of its last successful build beneath
//! its output directory. The next build compares that record against the
//! current state to decide whether the bundle can be skipped.
//!
//! # Decision Order
//!
//! | Check | Miss reason |
//! |-------|-------------|
//! | `cache = false` | cache disabled |
//! | no optimizer key configured | optimizer cache key is missing |
//! | optimizer key differs | optimizer cache key mismatch |
//! | cross-bundle export ids differ | bundle references outdated |
//! | record has no cache key | bundle cache key is missing |
//! | re-hashed key differs | cache key mismatch |

pub mod decision;
pub mod diff;
pub mod hash;
pub mod store;

pub use decision::{get_cache_decision, get_cache_decisions, CacheDecision, NotCachedReason};
pub use hash::{get_hashes, hash_file, FileHashes};
pub use store::{BundleCache, CacheRecord, CACHE_FILE_NAME};
