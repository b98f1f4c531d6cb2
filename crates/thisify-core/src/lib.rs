//! Core infrastructure for thisify.
//!
//! This crate provides the language-agnostic pieces the qualification
//! operation is built on:
//! - Spans, content hashes and text position conversions
//! - A mutable arena syntax tree with stable node identity
//! - Member and reference facts exchanged with the host's reference index
//! - Host collaborator traits (editor, reference index, transactions)
//! - A scoped write transaction with rollback on early exit
//! - Error types and error codes
//! - JSON output types for CLI responses

pub mod error;
pub mod facts;
pub mod host;
pub mod output;
pub mod patch;
pub mod syntax;
pub mod text;
pub mod transaction;
pub mod types;
