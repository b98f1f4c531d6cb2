//! Error types and error code constants for thisify.
//!
//! This module provides a unified error type (`ThisifyError`) that bridges
//! domain-specific errors from the tree, the host collaborators and the
//! operation itself into a common format suitable for JSON output.
//!
//! ## Error Code Mapping
//!
//! - `2`: Invalid arguments (bad location, malformed configuration)
//! - `3`: Resolution errors (file not found)
//! - `4`: Apply errors (transaction refused or rolled back, write failed)
//! - `10`: Internal errors (bugs, unexpected state)
//!
//! ## Design
//!
//! - **Unified type**: `ThisifyError` is the single error type for CLI output
//! - **Bridging**: `impl From<X> for ThisifyError` bridges domain errors
//! - **Code mapping**: `OutputErrorCode` provides stable integer codes for JSON

use std::fmt;

use thiserror::Error;

use crate::host::HostError;
use crate::syntax::TreeError;

pub use crate::types::Location;

// ============================================================================
// Output Error Codes
// ============================================================================

/// Error codes for JSON output.
///
/// These codes map to CLI exit codes and appear in JSON error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OutputErrorCode {
    /// Invalid arguments from caller (bad input, malformed configuration).
    InvalidArguments = 2,
    /// Resolution errors (file not found).
    ResolutionError = 3,
    /// Apply errors (rewrite rolled back, write failed).
    ApplyError = 4,
    /// Internal errors (bugs, unexpected state).
    InternalError = 10,
}

impl OutputErrorCode {
    /// Get the numeric code value.
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for OutputErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ============================================================================
// Unified Error Type
// ============================================================================

/// Unified error type for CLI output.
#[derive(Debug, Error)]
pub enum ThisifyError {
    /// Invalid arguments from caller.
    #[error("invalid arguments: {message}")]
    InvalidArguments {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// File not found.
    #[error("file not found: {path}")]
    FileNotFound { path: String },

    /// The rewrite could not be applied; the document was left unchanged.
    #[error("apply error: {message}")]
    ApplyError {
        message: String,
        file: Option<String>,
    },

    /// Internal error (bug or unexpected state).
    #[error("internal error: {message}")]
    InternalError { message: String },
}

// ============================================================================
// Error Code Mapping
// ============================================================================

impl From<&ThisifyError> for OutputErrorCode {
    fn from(err: &ThisifyError) -> Self {
        match err {
            ThisifyError::InvalidArguments { .. } => OutputErrorCode::InvalidArguments,
            ThisifyError::FileNotFound { .. } => OutputErrorCode::ResolutionError,
            ThisifyError::ApplyError { .. } => OutputErrorCode::ApplyError,
            ThisifyError::InternalError { .. } => OutputErrorCode::InternalError,
        }
    }
}

impl From<ThisifyError> for OutputErrorCode {
    fn from(err: ThisifyError) -> Self {
        OutputErrorCode::from(&err)
    }
}

// ============================================================================
// Bridges
// ============================================================================

impl From<TreeError> for ThisifyError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::Unbalanced(message) => ThisifyError::InternalError {
                message: format!("tree construction failed: {message}"),
            },
            other => ThisifyError::ApplyError {
                message: format!("syntax tree inconsistency: {other}"),
                file: None,
            },
        }
    }
}

impl From<HostError> for ThisifyError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Tree(tree_err) => ThisifyError::from(tree_err),
            HostError::Index(message) => ThisifyError::InternalError {
                message: format!("reference index failed: {message}"),
            },
            other @ (HostError::TransactionRefused { .. } | HostError::CommitFailed { .. }) => {
                ThisifyError::ApplyError {
                    message: other.to_string(),
                    file: None,
                }
            }
        }
    }
}

// ============================================================================
// Convenience Constructors
// ============================================================================

impl ThisifyError {
    /// Create an invalid arguments error.
    pub fn invalid_args(message: impl Into<String>) -> Self {
        ThisifyError::InvalidArguments {
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid arguments error with JSON details.
    pub fn invalid_args_with_details(
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        ThisifyError::InvalidArguments {
            message: message.into(),
            details: Some(details),
        }
    }

    /// Create a file not found error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        ThisifyError::FileNotFound { path: path.into() }
    }

    /// Create an apply error attributed to a file.
    pub fn apply(message: impl Into<String>, file: impl Into<String>) -> Self {
        ThisifyError::ApplyError {
            message: message.into(),
            file: Some(file.into()),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ThisifyError::InternalError {
            message: message.into(),
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> OutputErrorCode {
        OutputErrorCode::from(self)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::FileId;
    use crate::syntax::NodeId;

    mod error_code_mapping {
        use super::*;

        #[test]
        fn invalid_arguments_maps_to_invalid_arguments() {
            let err = ThisifyError::invalid_args("bad location");
            assert_eq!(
                OutputErrorCode::from(&err),
                OutputErrorCode::InvalidArguments
            );
            assert_eq!(err.error_code().code(), 2);
        }

        #[test]
        fn file_not_found_maps_to_resolution_error() {
            let err = ThisifyError::file_not_found("Missing.java");
            assert_eq!(err.error_code(), OutputErrorCode::ResolutionError);
            assert_eq!(err.error_code().code(), 3);
        }

        #[test]
        fn apply_error_maps_to_apply_error() {
            let err = ThisifyError::apply("rolled back", "Foo.java");
            assert_eq!(err.error_code().code(), 4);
        }

        #[test]
        fn internal_error_maps_to_internal_error() {
            let err = ThisifyError::internal("unexpected state");
            assert_eq!(err.error_code().code(), 10);
        }
    }

    mod bridges {
        use super::*;

        #[test]
        fn detached_node_is_an_apply_error() {
            let err = ThisifyError::from(TreeError::Detached(NodeId(4)));
            assert_eq!(err.error_code(), OutputErrorCode::ApplyError);
            assert_eq!(
                err.to_string(),
                "apply error: syntax tree inconsistency: node n4 is detached from the tree"
            );
        }

        #[test]
        fn unbalanced_builder_is_internal() {
            let err = ThisifyError::from(TreeError::Unbalanced("1 node(s) still open".into()));
            assert_eq!(err.error_code(), OutputErrorCode::InternalError);
        }

        #[test]
        fn refused_transaction_is_an_apply_error() {
            let err = ThisifyError::from(HostError::TransactionRefused {
                file: FileId::new(0),
                label: "Insert This".to_string(),
                reason: "read-only".to_string(),
            });
            assert_eq!(err.error_code(), OutputErrorCode::ApplyError);
            assert!(err.to_string().contains("read-only"));
        }

        #[test]
        fn host_tree_errors_unwrap() {
            let err = ThisifyError::from(HostError::Tree(TreeError::UnknownNode(NodeId(1))));
            assert_eq!(err.error_code(), OutputErrorCode::ApplyError);
        }
    }

    mod output_error_code {
        use super::*;

        #[test]
        fn code_values_are_stable() {
            assert_eq!(OutputErrorCode::InvalidArguments.code(), 2);
            assert_eq!(OutputErrorCode::ResolutionError.code(), 3);
            assert_eq!(OutputErrorCode::ApplyError.code(), 4);
            assert_eq!(OutputErrorCode::InternalError.code(), 10);
        }

        #[test]
        fn display_shows_code() {
            assert_eq!(format!("{}", OutputErrorCode::InvalidArguments), "2");
            assert_eq!(format!("{}", OutputErrorCode::InternalError), "10");
        }
    }
}
