//! Java support for thisify.
//!
//! This crate provides the host side of the qualification command for Java
//! sources, and the command itself:
//! - A lossless tokenizer and a lenient parser producing `SyntaxTree`s
//! - Declaration lookups over the parsed trees
//! - A name-resolving reference index
//! - An in-memory editor session and a recording transaction host
//! - The "Insert This" operation (member collection, reference
//!   classification and rewriting)

pub mod editor;
pub mod index;
pub mod lookup;
pub mod ops;
pub mod parser;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod tokenizer;

// `impl From<InsertThisError> for ThisifyError`
mod error_bridges;

pub use editor::{Document, EditorSession, HostEvent, RecordingHost};
pub use index::JavaReferenceIndex;
pub use parser::{parse_java, ParseDiagnostic, ParsedFile};
