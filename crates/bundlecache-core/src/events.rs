//! Bundle lifecycle events.

use serde::{Deserialize, Serialize};

/// Single discriminated union for everything listeners can observe.
///
/// Serialized with an internal `type` tag:
///
/// ```json
/// { "type": "bundle_progress", "name": "ui", "done": 0.5 }
/// { "type": "busy" }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BundleEvent {
    /// A Load task started working on the bundle.
    BundleLoading {
        /// Bundle name.
        name: String,
    },

    /// Fraction of the bundle available locally.
    BundleProgress {
        /// Bundle name.
        name: String,
        /// Completed fraction in `0.0..=1.0`.
        done: f64,
    },

    /// Every file of the bundle is available locally.
    BundleLoaded {
        /// Bundle name.
        name: String,
    },

    /// A Load attempt failed; the bundle stays `loaded = false`.
    BundleError {
        /// Bundle name.
        name: String,
        /// Human-readable message.
        error: String,
        /// Whether the scheduler will retry automatically.
        retryable: bool,
    },

    /// The task list became non-empty and a task started.
    Busy,

    /// No runnable task remains.
    NotBusy,
}

impl BundleEvent {
    /// Create a loading event.
    pub fn loading(name: impl Into<String>) -> Self {
        Self::BundleLoading { name: name.into() }
    }

    /// Create a progress event, clamping the fraction to `0.0..=1.0`.
    pub fn progress(name: impl Into<String>, done: f64) -> Self {
        Self::BundleProgress {
            name: name.into(),
            done: done.clamp(0.0, 1.0),
        }
    }

    /// Create a loaded event.
    pub fn loaded(name: impl Into<String>) -> Self {
        Self::BundleLoaded { name: name.into() }
    }

    /// Create an error event.
    pub fn error(name: impl Into<String>, error: impl Into<String>, retryable: bool) -> Self {
        Self::BundleError {
            name: name.into(),
            error: error.into(),
            retryable,
        }
    }

    /// The bundle this event concerns, if any.
    pub fn bundle_name(&self) -> Option<&str> {
        match self {
            Self::BundleLoading { name }
            | Self::BundleProgress { name, .. }
            | Self::BundleLoaded { name }
            | Self::BundleError { name, .. } => Some(name),
            Self::Busy | Self::NotBusy => None,
        }
    }
}
