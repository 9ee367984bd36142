//! Network transport port.
//!
//! The transport moves bytes from a remote identifier into a local file and
//! reports progress. It has no notion of bundles, retries or timeouts; the
//! download orchestrator layers those on top.
//!
//! # Cancellation
//!
//! Dropping the future returned by `download` aborts the transfer. The
//! orchestrator races it against the task's cancellation token and its own
//! inactivity timer, so implementations need no explicit abort hook.

use async_trait::async_trait;
use thiserror::Error;

use super::file_system::FileHandle;

/// Progress callback: `(bytes_loaded, bytes_total)`.
///
/// `bytes_total` is 0 when the remote size is unknown.
pub type ProgressFn<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// HTTP statuses that will not change on retry.
const PERMANENT_STATUSES: [u16; 5] = [400, 401, 403, 404, 410];

/// Errors reported by a transport.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The transfer was aborted.
    #[error("transfer cancelled")]
    Cancelled,

    /// The transport's own timeout fired.
    #[error("transfer timed out")]
    Timeout,

    /// Connection-level failure (DNS, reset, TLS, dropped stream).
    #[error("connection error: {message}")]
    Connection {
        /// Detailed error message.
        message: String,
    },

    /// The server answered with a non-success status.
    #[error("HTTP {code}: {message}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Reason phrase or body excerpt.
        message: String,
    },

    /// Writing the local file failed.
    #[error("write error: {message}")]
    Write {
        /// Detailed error message.
        message: String,
    },

    /// Uncategorized failure, including success-looking responses that
    /// nonetheless delivered no data.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl TransportError {
    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a status error.
    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self::Status {
            code,
            message: message.into(),
        }
    }

    /// Create a write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if a later attempt could succeed.
    ///
    /// Only cancellation and permanent HTTP rejections are terminal.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled => false,
            Self::Status { code, .. } => !PERMANENT_STATUSES.contains(code),
            Self::Timeout | Self::Connection { .. } | Self::Write { .. } | Self::Other { .. } => {
                true
            }
        }
    }
}

/// Port for the network transport.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Download `remote_uri` into `destination`, overwriting its contents.
    ///
    /// `progress` may be called any number of times, from the task driving
    /// the future. Resolves once the file is complete or the transfer failed.
    async fn download(
        &self,
        remote_uri: &str,
        destination: &FileHandle,
        progress: ProgressFn<'_>,
    ) -> Result<(), TransportError>;
}
