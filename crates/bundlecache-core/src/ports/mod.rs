//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces the orchestration layer expects from its
//! collaborators. They contain no implementation details and use only domain
//! types.
//!
//! # Design Rules
//!
//! - No reqwest, `tokio::fs` or serialization-format types in any signature
//! - Every port is object-safe and used as `Arc<dyn Port>`
//! - Each port carries its own small error type; the orchestrators decide
//!   what is retryable

pub mod event_listener;
pub mod file_system;
pub mod key_value_store;
pub mod transport;

pub use event_listener::{BundleEventListener, ChannelListener};
pub use file_system::{DirectoryHandle, FileHandle, FileOpenOptions, FileSystemPort, FsError};
pub use key_value_store::{KeyValueStorePort, MemoryStore, StoreError};
pub use transport::{ProgressFn, TransportError, TransportPort};
