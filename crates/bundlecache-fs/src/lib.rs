//! Local storage adapters for bundlecache.
//!
//! - [`LocalFileSystem`] implements `FileSystemPort` on top of `tokio::fs`
//! - [`JsonFileStore`] implements `KeyValueStorePort` as a single JSON file
//!
//! Both map I/O failures to the port error types at the boundary; nothing
//! from `std::io` leaks into the orchestration layer.

#![deny(unsafe_code)]

mod file_system;
mod json_store;

pub use file_system::LocalFileSystem;
pub use json_store::JsonFileStore;
