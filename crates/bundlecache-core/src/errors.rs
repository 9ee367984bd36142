//! Error types for bundle operations.
//!
//! - `MalformedBundleError` - structural input errors, rejected synchronously
//! - `InitError` - initialization failures, surfaced once
//! - `LoadError` - per-file failures inside a Load task, converted to task state

use thiserror::Error;

use crate::ports::{FsError, StoreError, TransportError};

/// A bundle failed structural validation.
///
/// Returned by `add_bundle` before any state is touched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum MalformedBundleError {
    /// The input was not an object.
    #[error("bundle must be an object")]
    NotAnObject,

    /// `name` is missing or not a string.
    #[error("bundle name must be a string")]
    NameNotString,

    /// `files` is missing or not a sequence.
    #[error("bundle files must be a list of strings")]
    FilesNotArray,

    /// An element of `files` is not a string.
    #[error("bundle file at index {index} is not a string")]
    FileNotString {
        /// Position of the offending entry.
        index: usize,
    },

    /// `fileSizes` is present but not a sequence.
    #[error("bundle fileSizes must be a list of byte counts")]
    SizesNotArray,

    /// An element of `fileSizes` is not a non-negative integer.
    #[error("bundle file size at index {index} is not a non-negative integer")]
    SizeNotInteger {
        /// Position of the offending entry.
        index: usize,
    },

    /// `fileSizes` and `files` have different lengths.
    #[error("bundle has {files} files but {sizes} file sizes")]
    SizeCountMismatch {
        /// Number of files.
        files: usize,
        /// Number of size hints.
        sizes: usize,
    },
}

/// The bundle cache could not be initialized.
#[derive(Debug, Error)]
pub enum InitError {
    /// The base directory could not be created or opened.
    #[error("cannot open cache directory '{path}': {source}")]
    Directory {
        /// Configured base directory.
        path: String,
        /// Underlying filesystem error.
        #[source]
        source: FsError,
    },

    /// The persisted registry could not be read.
    #[error("cannot read bundle registry '{key}': {source}")]
    Store {
        /// Store key of the registry record.
        key: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// The persisted registry exists but cannot be decoded.
    #[error("bundle registry '{key}' is corrupt: {message}")]
    CorruptRegistry {
        /// Store key of the registry record.
        key: String,
        /// Decoder message.
        message: String,
    },
}

/// A single file of a Load task could not be made available locally.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// The task was canceled while this file was in flight.
    #[error("transfer cancelled")]
    Cancelled,

    /// The transport stopped reporting progress.
    #[error("no progress downloading {uri} for {millis}ms")]
    Timeout {
        /// Remote file identifier.
        uri: String,
        /// Inactivity window that elapsed, in milliseconds.
        millis: u64,
    },

    /// The transport reported a failure.
    #[error("failed to download {uri}: {source}")]
    Transport {
        /// Remote file identifier.
        uri: String,
        /// Transport error.
        #[source]
        source: TransportError,
    },

    /// The local placeholder could not be probed or created.
    #[error("local file {name} unavailable: {source}")]
    FileSystem {
        /// Content-derived local file name.
        name: String,
        /// Filesystem error.
        #[source]
        source: FsError,
    },
}

impl LoadError {
    /// Wrap a transport failure, folding transport-side cancellation.
    pub fn transport(uri: impl Into<String>, source: TransportError) -> Self {
        if source.is_cancelled() {
            return Self::Cancelled;
        }
        Self::Transport {
            uri: uri.into(),
            source,
        }
    }

    /// Wrap a filesystem failure.
    pub fn file_system(name: impl Into<String>, source: FsError) -> Self {
        Self::FileSystem {
            name: name.into(),
            source,
        }
    }

    /// Check if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if the scheduler should retry the task on its next cycle.
    ///
    /// Anything not known to be terminal is retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled => false,
            Self::Transport { source, .. } => source.is_retryable(),
            Self::Timeout { .. } | Self::FileSystem { .. } => true,
        }
    }

    /// Convert to a user-friendly message for `bundle_error` events.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "Download was cancelled.".to_string(),
            Self::Timeout { uri, millis } => {
                format!("Download of {uri} stalled for {millis} ms.")
            }
            Self::Transport {
                uri,
                source: TransportError::Status { code, .. },
            } => format!("Server answered HTTP {code} for {uri}."),
            Self::Transport { uri, source } => format!("Could not download {uri}: {source}"),
            Self::FileSystem { source, .. } => format!("Local storage error: {source}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_messages() {
        let err = MalformedBundleError::SizeCountMismatch { files: 1, sizes: 2 };
        assert_eq!(err.to_string(), "bundle has 1 files but 2 file sizes");
    }

    #[test]
    fn test_transport_cancellation_folds() {
        let err = LoadError::transport("http://x/a", TransportError::Cancelled);
        assert!(err.is_cancelled());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retry_classification() {
        assert!(LoadError::transport("u", TransportError::connection("reset")).is_retryable());
        assert!(LoadError::transport("u", TransportError::status(503, "busy")).is_retryable());
        assert!(!LoadError::transport("u", TransportError::status(404, "gone")).is_retryable());
        assert!(
            LoadError::Timeout {
                uri: "u".to_string(),
                millis: 30_000
            }
            .is_retryable()
        );
        assert!(LoadError::file_system("n", FsError::io("Other", "disk full")).is_retryable());
    }

    #[test]
    fn test_user_message_mentions_status() {
        let err = LoadError::transport("http://x/a", TransportError::status(500, "boom"));
        assert!(err.user_message().contains("500"));
        assert!(err.user_message().contains("http://x/a"));
    }
}
