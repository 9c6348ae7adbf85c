//! Bundle Optimizer - incremental multi-bundle builds
//!
//! Decides per bundle whether its last build can be reused and drives one
//! multi-target bundler over the rest, reporting per-bundle events.

pub mod bundle;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestration;

pub use error::{OptimizerError, OptimizerResult};
