//! Java refactoring operations.
//!
//! - [`collect`]: the non-static members of a class
//! - [`qualify`]: per-member reference classification and rewriting
//! - [`insert_this`]: the command tying both together under one transaction

pub mod collect;
pub mod insert_this;
pub mod qualify;

pub use collect::collect_instance_members;
pub use insert_this::{
    insert_this, ClassBoundary, InsertThisError, InsertThisOptions, InsertThisOutcome,
    InsertThisReport, MemberReport, SkipCause, INSERT_THIS_LABEL,
};
pub use qualify::{classify_site, rewrite_references, RewriteSummary, SkipReason, Verdict};
