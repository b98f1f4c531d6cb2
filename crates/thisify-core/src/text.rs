//! Conversion from a 1-based line:column caret to a byte offset.
//!
//! ## Coordinate Conventions
//!
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Line/column values of 0 are treated as 1
//! - Columns count Unicode scalar values (chars), not bytes, so a caret
//!   position typed by a user lands on the intended character even when the
//!   line contains multi-byte identifiers or string literals.

/// Convert 1-indexed line and column to a byte offset.
///
/// A column past the end of its line clamps to the line end; a line past the
/// end of the content returns the content length.
pub fn position_to_byte_offset(content: &str, line: u32, col: u32) -> usize {
    let line = line.max(1);
    let col = col.max(1);

    let mut current_line = 1u32;
    let mut start = 0usize;

    for (i, ch) in content.char_indices() {
        if current_line == line {
            break;
        }
        if ch == '\n' {
            current_line += 1;
            start = i + 1;
        }
    }

    if current_line != line {
        return content.len();
    }

    let mut current_col = 1u32;
    for (j, c) in content[start..].char_indices() {
        if current_col == col || c == '\n' {
            return start + j;
        }
        current_col += 1;
    }
    content.len()
}
