//! Unified diff rendering.

use similar::TextDiff;

/// Unified diff of one file, with `a/` and `b/` headers.
///
/// Empty when the two texts are equal.
pub fn unified_diff(path: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}
