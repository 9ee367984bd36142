//! Bundle download cache: scheduling and orchestration.
//!
//! This crate owns everything that happens between a client registering a
//! bundle and its files being available locally:
//!
//! - `manager` - the `BundleCache` facade, Load and Remove orchestrators
//! - `queue` - the task scheduler state machine (pure, no I/O)
//! - `pipeline` - deferred, batched event delivery to listeners
//! - `progress` - weighted, monotonic bundle progress
//!
//! Storage, filesystem and network access go through the ports defined in
//! `bundlecache-core`; adapters live in `bundlecache-fs` and `bundlecache-http`.

// Re-export core types for convenience
pub use bundlecache_core::{
    Bundle, BundleCacheConfig, BundleEvent, BundleEventListener, ChannelListener, InitError,
    MalformedBundleError, NewBundle,
};

// Internal modules (pub(crate) to keep implementation private)
pub(crate) mod progress;

pub mod pipeline;
pub mod queue;

mod manager;

pub use manager::{BundleCache, BundleCacheDeps};
pub use pipeline::EventPipeline;
pub use queue::{TaskId, TaskKind, TaskState, TaskSummary};
