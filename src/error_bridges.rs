//! Error bridge implementations for front-door errors.
//!
//! This module provides `impl From<X> for ThisifyError` conversions for error
//! types owned by the root package. The bridge for the command's own error
//! lives in `thisify-java`, next to the type it converts.

use thisify_core::error::ThisifyError;

use crate::config::ConfigError;

// ============================================================================
// Bridge: ConfigError -> ThisifyError
// ============================================================================

impl From<ConfigError> for ThisifyError {
    fn from(err: ConfigError) -> Self {
        let details = serde_json::json!({ "config": err.path().display().to_string() });
        ThisifyError::invalid_args_with_details(err.to_string(), details)
    }
}
