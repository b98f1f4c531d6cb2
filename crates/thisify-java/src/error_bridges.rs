//! Bridge from the command's error type to the unified `ThisifyError`.
//!
//! Lives here rather than in `thisify-core` because `InsertThisError` is a
//! Java-side type; the core only knows its own tree and host errors.

use thisify_core::error::ThisifyError;

use crate::ops::insert_this::InsertThisError;

impl From<InsertThisError> for ThisifyError {
    fn from(err: InsertThisError) -> Self {
        match err {
            InsertThisError::Tree(tree_err) => ThisifyError::from(tree_err),
            InsertThisError::Host(host_err) => ThisifyError::from(host_err),
        }
    }
}
