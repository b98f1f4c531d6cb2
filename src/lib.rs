//! Thisify: qualify member references with an explicit `this` receiver.
//!
//! Places a caret in a Java class and rewrites every unqualified reference
//! to one of its instance fields or methods as `this.name`, leaving static
//! members, nested classes, constructor delegation and already-qualified
//! references alone.

// Core infrastructure - re-exported from thisify-core
pub use thisify_core::error;
pub use thisify_core::facts;
pub use thisify_core::host;
pub use thisify_core::output;
pub use thisify_core::patch;
pub use thisify_core::syntax;
pub use thisify_core::text;
pub use thisify_core::transaction;
pub use thisify_core::types;

// Language support
pub use thisify_java as java;

// Front door
pub mod cli;
pub mod config;
pub mod diff;

// Error bridges - converts front-door errors to ThisifyError
mod error_bridges;
