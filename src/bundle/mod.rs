//! Bundle entities
//!
//! A bundle is one independently compiled unit of the application. Bundles
//! are parsed once per build from a JSON list and never change afterwards.

mod cache_key;
mod deps;
pub mod refs;
pub mod spec;

pub use cache_key::CacheKey;
pub use deps::BundleDependencies;
pub use refs::{BundleRef, BundleRefs};
pub use spec::{parse_bundles, Bundle, BundleSpec, BundleType, DEFAULT_IMPLICIT_DEPENDENCY};
