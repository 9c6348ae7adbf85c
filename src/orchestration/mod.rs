//! Compile orchestration
//!
//! Drives one multi-target bundler over a set of bundles:
//! - `compiler`: the bundler seam and its wire types
//! - `process`: a bundler running as a child process
//! - `orchestrator`: hook handling, event emission and cache writes

pub mod compiler;
pub mod events;
pub mod modules;
mod orchestrator;
mod process;

pub use compiler::{BundlerModule, Compiler, CompilerHook, CompilerJob, PassStats};
pub use events::{CompilerEvent, CompilerMsg};
pub use modules::{summarize_pass, PassSummary, EXTRA_STYLESHEET_WORK_UNITS};
pub use orchestrator::{Orchestrator, OrchestratorHandle, STATS_FILE_NAME};
pub use process::ProcessCompiler;

use std::collections::VecDeque;

/// Max number of output lines to include in compiler error messages.
const BUILD_ERROR_TAIL_LINES: usize = 50;

/// Rolling tail of child process output for error diagnostics.
///
/// Watch mode runs indefinitely, so only the last `BUILD_ERROR_TAIL_LINES`
/// lines are retained.
#[derive(Debug, Default)]
pub(crate) struct OutputTail {
    lines: VecDeque<String>,
}

impl OutputTail {
    pub(crate) fn push(&mut self, line: String) {
        if self.lines.len() == BUILD_ERROR_TAIL_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    pub(crate) fn render(&self) -> String {
        self.lines
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_tail_keeps_last_lines() {
        let mut tail = OutputTail::default();
        for i in 0..(BUILD_ERROR_TAIL_LINES + 10) {
            tail.push(format!("line {}", i));
        }

        let rendered = tail.render();
        assert_eq!(rendered.lines().count(), BUILD_ERROR_TAIL_LINES);
        assert!(rendered.starts_with("line 10\n"));
        assert!(rendered.ends_with(&format!("line {}", BUILD_ERROR_TAIL_LINES + 9)));
    }

    #[test]
    fn empty_tail_renders_empty() {
        assert_eq!(OutputTail::default().render(), "");
    }
}
