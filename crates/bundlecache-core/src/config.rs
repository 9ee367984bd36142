//! Bundle cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default interval between automatic retry passes.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Default inactivity window before a transfer is abandoned.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for creating a bundle cache.
///
/// Durations are stored in milliseconds so the struct can be read from
/// plain JSON or YAML settings files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleCacheConfig {
    /// Directory (relative to the filesystem provider) holding cached files.
    pub base_directory: String,
    /// Milliseconds between retry passes over failed tasks.
    pub retry_interval_ms: u64,
    /// Milliseconds without transfer progress before a download fails.
    pub transfer_timeout_ms: u64,
    /// Explicit store key for the registry; derived from `base_directory` when unset.
    pub registry_key: Option<String>,
}

impl Default for BundleCacheConfig {
    fn default() -> Self {
        Self {
            base_directory: "bundles".to_string(),
            retry_interval_ms: duration_ms(DEFAULT_RETRY_INTERVAL),
            transfer_timeout_ms: duration_ms(DEFAULT_TRANSFER_TIMEOUT),
            registry_key: None,
        }
    }
}

impl BundleCacheConfig {
    /// Create a config for the given base directory.
    #[must_use]
    pub fn new(base_directory: impl Into<String>) -> Self {
        Self {
            base_directory: base_directory.into(),
            ..Default::default()
        }
    }

    /// Set the retry interval.
    #[must_use]
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval_ms = duration_ms(interval);
        self
    }

    /// Set the transfer inactivity timeout.
    #[must_use]
    pub fn with_transfer_timeout(mut self, timeout: Duration) -> Self {
        self.transfer_timeout_ms = duration_ms(timeout);
        self
    }

    /// Override the registry store key.
    #[must_use]
    pub fn with_registry_key(mut self, key: impl Into<String>) -> Self {
        self.registry_key = Some(key.into());
        self
    }

    /// Interval between retry passes (never zero).
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms.max(1))
    }

    /// Transfer inactivity timeout (never zero).
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms.max(1))
    }

    /// Store key of the persisted registry.
    pub fn registry_key(&self) -> String {
        self.registry_key
            .clone()
            .unwrap_or_else(|| format!("bundlecache.registry:{}", self.base_directory))
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
