//! Common types shared between error and output modules.
//!
//! This module contains types that are used by both the error and output modules,
//! avoiding circular dependencies.

use serde::{Deserialize, Serialize};

// ============================================================================
// Location Type
// ============================================================================

/// Location in a source file.
///
/// - `file`: Path as given by the caller
/// - `line`: 1-indexed line number
/// - `col`: 1-indexed column, counted in chars
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Location {
    /// File path.
    pub file: String,
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
}

impl Location {
    /// Create a new location.
    pub fn new(file: impl Into<String>, line: u32, col: u32) -> Self {
        Location {
            file: file.into(),
            line,
            col,
        }
    }

    /// Parse a location from "path:line:col" format.
    ///
    /// This parsing is robust against paths containing colons (e.g., Windows paths).
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.rsplitn(3, ':').collect();
        if parts.len() != 3 {
            return None;
        }
        let col: u32 = parts[0].parse().ok()?;
        let line: u32 = parts[1].parse().ok()?;
        let file = parts[2].to_string();
        if file.is_empty() {
            return None;
        }
        Some(Location::new(file, line, col))
    }
}
