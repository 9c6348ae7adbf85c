//! Per-bundle compiler events

use serde::{Deserialize, Serialize};
use std::fmt;

/// State reported for a bundle during a compile pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CompilerEvent {
    Running,
    #[serde(rename_all = "camelCase")]
    Success { module_count: usize },
    /// Compilation finished but produced errors
    Failure { message: String },
    /// The pass could not run; no further events follow for the bundle
    Error { message: String },
}

impl CompilerEvent {
    /// Whether this event ends a pass
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for CompilerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Success { module_count } => write!(f, "success ({} modules)", module_count),
            Self::Failure { .. } => write!(f, "failure"),
            Self::Error { .. } => write!(f, "error"),
        }
    }
}

/// A compiler event tagged with the bundle it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerMsg {
    pub bundle_id: String,
    pub state: CompilerEvent,
}

impl CompilerMsg {
    pub fn new(bundle_id: impl Into<String>, state: CompilerEvent) -> Self {
        Self {
            bundle_id: bundle_id.into(),
            state,
        }
    }
}
