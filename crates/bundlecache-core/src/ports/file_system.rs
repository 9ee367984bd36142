//! Hierarchical filesystem provider port.
//!
//! Handles are plain values naming a location; they hold no OS resources, so
//! they can be cloned freely and passed across tasks.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a filesystem provider.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FsError {
    /// The file or directory does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// Path that was looked up.
        path: String,
    },

    /// Exclusive creation was requested but the file exists.
    #[error("already exists: {path}")]
    AlreadyExists {
        /// Path that was created.
        path: String,
    },

    /// A directory was expected.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// Offending path.
        path: String,
    },

    /// Any other I/O failure.
    #[error("I/O error ({kind}): {message}")]
    Io {
        /// The kind of I/O error (e.g., "`PermissionDenied`").
        kind: String,
        /// Detailed error message.
        message: String,
    },
}

impl FsError {
    /// Create an I/O error from kind and message strings.
    pub fn io(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Io {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Map a `std::io::Error` for the given path.
    #[must_use]
    pub fn from_io_error(err: &std::io::Error, path: &Path) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            kind => Self::Io {
                kind: format!("{kind:?}"),
                message: err.to_string(),
            },
        }
    }

    /// Check if the target simply does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A directory obtained from `get_or_create_directory`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DirectoryHandle {
    path: PathBuf,
}

impl DirectoryHandle {
    /// Wrap a directory path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a child entry.
    pub fn child(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

/// A file obtained from `get_file`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    /// Wrap a file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// How `get_file` treats a missing or existing file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileOpenOptions {
    /// Create the file if it does not exist.
    pub create: bool,
    /// With `create`, fail if the file already exists.
    pub exclusive: bool,
}

impl FileOpenOptions {
    /// Open an existing file only.
    pub const fn existing() -> Self {
        Self {
            create: false,
            exclusive: false,
        }
    }

    /// Open or create (truncating) the file.
    pub const fn create() -> Self {
        Self {
            create: true,
            exclusive: false,
        }
    }

    /// Create the file, failing if it exists.
    pub const fn create_new() -> Self {
        Self {
            create: true,
            exclusive: true,
        }
    }
}

/// Port for the local filesystem provider.
#[async_trait]
pub trait FileSystemPort: Send + Sync {
    /// Create (recursively) or open a directory.
    async fn get_or_create_directory(&self, path: &str) -> Result<DirectoryHandle, FsError>;

    /// Look up, or create, a file inside `dir`.
    ///
    /// With `FileOpenOptions::existing()` this is a presence probe and
    /// returns `FsError::NotFound` when the file is absent.
    async fn get_file(
        &self,
        dir: &DirectoryHandle,
        name: &str,
        options: FileOpenOptions,
    ) -> Result<FileHandle, FsError>;

    /// Delete a file.
    async fn remove_file(&self, file: &FileHandle) -> Result<(), FsError>;

    /// A URL under which the file can be opened by the embedding application.
    fn resolve_url(&self, file: &FileHandle) -> String;
}
