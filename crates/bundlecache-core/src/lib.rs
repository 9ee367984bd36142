//! Core domain types and port definitions for bundlecache.
//!
//! This crate holds everything the orchestration layer needs to agree on
//! without performing any I/O itself:
//!
//! - `bundle` - Bundle records, the in-memory registry, content-derived naming
//! - `events` - Lifecycle events delivered to listeners
//! - `errors` - Structural, initialization and per-file load errors
//! - `ports` - Traits for the key-value store, filesystem, transport and listeners
//! - `config` - Runtime configuration for the bundle cache

pub mod bundle;
pub mod config;
pub mod errors;
pub mod events;
pub mod ports;

// Re-export commonly used types for convenience
pub use bundle::{
    Bundle, BundleRecord, BundleRegistry, NewBundle, file_extension, local_file_name,
};
pub use config::{BundleCacheConfig, DEFAULT_RETRY_INTERVAL, DEFAULT_TRANSFER_TIMEOUT};
pub use errors::{InitError, LoadError, MalformedBundleError};
pub use events::BundleEvent;
pub use ports::{
    BundleEventListener, ChannelListener, DirectoryHandle, FileHandle, FileOpenOptions, FsError,
    FileSystemPort, KeyValueStorePort, MemoryStore, ProgressFn, StoreError, TransportError,
    TransportPort,
};
