//! Human-readable differences between cached and current values

use serde::Serialize;
use similar::TextDiff;

/// Render a unified diff of the pretty JSON forms of `cached` and `current`
///
/// Returns `None` when both values serialize identically.
pub fn diff_values<T: Serialize + ?Sized, U: Serialize + ?Sized>(
    cached: &T,
    current: &U,
) -> Option<String> {
    let cached = to_pretty(cached);
    let current = to_pretty(current);

    if cached == current {
        return None;
    }

    let diff = TextDiff::from_lines(&cached, &current);
    let unified_diff = diff
        .unified_diff()
        .context_radius(3)
        .header("cached", "current")
        .to_string();

    Some(unified_diff)
}

fn to_pretty<T: Serialize + ?Sized>(value: &T) -> String {
    // Trailing newline keeps the last line from being reported as changed
    let mut text = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("<unserializable: {}>", e));
    text.push('\n');
    text
}
