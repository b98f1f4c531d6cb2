//! JSON output types and serialization for CLI responses.
//!
//! ## Design Principles
//!
//! 1. **Status first:** Every response has `status` as first field
//! 2. **Deterministic:** Same input -> same output (field order, map ordering)
//! 3. **Nullable vs absent:** Absent field means "not applicable"
//! 4. **Versioned:** Schema version in response enables forward compatibility

use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::error::{OutputErrorCode, ThisifyError};
use crate::facts::MemberKind;
use crate::patch::ContentHash;

pub use crate::types::Location;

/// Current schema version for all responses.
pub const SCHEMA_VERSION: &str = "1";

// ============================================================================
// Error Types
// ============================================================================

/// Error information for error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Numeric error code.
    pub code: u8,
    /// Human-readable message.
    pub message: String,
    /// Error-specific structured data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorInfo {
    /// Create from a ThisifyError.
    pub fn from_error(err: &ThisifyError) -> Self {
        let details = match err {
            ThisifyError::InvalidArguments { details, .. } => details.clone(),
            ThisifyError::FileNotFound { path } => Some(serde_json::json!({ "path": path })),
            ThisifyError::ApplyError { file, .. } => {
                file.as_ref().map(|f| serde_json::json!({ "file": f }))
            }
            ThisifyError::InternalError { .. } => None,
        };
        ErrorInfo {
            code: OutputErrorCode::from(err).code(),
            message: err.to_string(),
            details,
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status: "error".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    /// Error information.
    pub error: ErrorInfo,
}

impl ErrorResponse {
    /// Create an error response from a ThisifyError.
    pub fn from_error(err: &ThisifyError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            error: ErrorInfo::from_error(err),
        }
    }
}

// ============================================================================
// Insert This Response
// ============================================================================

/// Whether the operation ran or was skipped on a precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseOutcome {
    Applied,
    Skipped,
}

/// Per-member line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub kind: MemberKind,
    pub name: String,
    /// References qualified for this member.
    pub rewritten: usize,
}

/// Response for one run of the qualification operation on a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertThisResponse {
    /// Status: "ok".
    pub status: String,
    /// Schema version for compatibility.
    pub schema_version: String,
    pub outcome: ResponseOutcome,
    /// Caret location the run started from.
    pub location: Location,
    /// Why the run was skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_cause: Option<String>,
    /// Name of the class at the caret.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Members visited, in processing order.
    pub members: Vec<MemberSummary>,
    /// Total references qualified.
    pub rewritten: usize,
    /// Reference sites left alone, counted by reason.
    pub skipped_sites: BTreeMap<String, usize>,
    /// Hash of the file before the run.
    pub before_hash: ContentHash,
    /// Hash of the file after the run.
    pub after_hash: ContentHash,
    /// Whether the file was written back.
    pub written: bool,
}

impl InsertThisResponse {
    /// A response for a run that stopped on a precondition.
    pub fn skipped(location: Location, cause: impl Into<String>, hash: ContentHash) -> Self {
        InsertThisResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            outcome: ResponseOutcome::Skipped,
            location,
            skip_cause: Some(cause.into()),
            class_name: None,
            members: Vec::new(),
            rewritten: 0,
            skipped_sites: BTreeMap::new(),
            before_hash: hash.clone(),
            after_hash: hash,
            written: false,
        }
    }

    /// A response for a run that completed.
    pub fn applied(
        location: Location,
        class_name: impl Into<String>,
        before_hash: ContentHash,
        after_hash: ContentHash,
    ) -> Self {
        InsertThisResponse {
            status: "ok".to_string(),
            schema_version: SCHEMA_VERSION.to_string(),
            outcome: ResponseOutcome::Applied,
            location,
            skip_cause: None,
            class_name: Some(class_name.into()),
            members: Vec::new(),
            rewritten: 0,
            skipped_sites: BTreeMap::new(),
            before_hash,
            after_hash,
            written: false,
        }
    }

    /// Whether the run changed the file content.
    pub fn changed(&self) -> bool {
        self.before_hash != self.after_hash
    }
}

// ============================================================================
// Emission
// ============================================================================

/// Emit a response as pretty-printed JSON to a writer.
pub fn emit_response<T: Serialize>(response: &T, writer: &mut impl Write) -> io::Result<()> {
    let json = serde_json::to_string_pretty(response)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

// ============================================================================
// Tests
// ============================================================================
