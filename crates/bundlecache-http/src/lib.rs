//! HTTP transport adapter for bundlecache.
//!
//! Streams response bodies straight into the destination file and reports
//! `(loaded, total)` after every chunk. Retries and inactivity timeouts are
//! the download orchestrator's job; this crate only moves bytes.

#![deny(unsafe_code)]

mod config;
mod transport;

pub use config::HttpTransportConfig;
pub use transport::HttpTransport;

#[cfg(test)]
use mockito as _;
#[cfg(test)]
use tempfile as _;
