//! Bundle domain types, registry, and content-derived naming.
//!
//! # Structure
//!
//! - `types` - `Bundle`, `NewBundle`, `BundleRecord` and input validation
//! - `registry` - The in-memory bundle map and its persisted form
//! - `naming` - Local file names derived from remote identifiers

pub mod naming;
pub mod registry;
pub mod types;

pub use naming::{file_extension, local_file_name};
pub use registry::BundleRegistry;
pub use types::{Bundle, BundleRecord, NewBundle};
