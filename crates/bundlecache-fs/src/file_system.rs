//! `tokio::fs` implementation of the filesystem port.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use url::Url;

use bundlecache_core::{DirectoryHandle, FileHandle, FileOpenOptions, FileSystemPort, FsError};

/// Filesystem provider rooted at a local directory.
///
/// Directory paths passed to `get_or_create_directory` are resolved relative
/// to the root.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    root: PathBuf,
}

impl LocalFileSystem {
    /// Create a provider rooted at `root`.
    ///
    /// A relative root is made absolute against the current directory so
    /// resolved URLs stay valid if the process changes directory later.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl FileSystemPort for LocalFileSystem {
    async fn get_or_create_directory(&self, path: &str) -> Result<DirectoryHandle, FsError> {
        let full = self.root.join(path);
        tokio::fs::create_dir_all(&full)
            .await
            .map_err(|e| FsError::from_io_error(&e, &full))?;
        let metadata = tokio::fs::metadata(&full)
            .await
            .map_err(|e| FsError::from_io_error(&e, &full))?;
        if !metadata.is_dir() {
            return Err(FsError::NotADirectory {
                path: full.display().to_string(),
            });
        }
        tracing::debug!(target: "bundlecache.fs", path = %full.display(), "Directory ready");
        Ok(DirectoryHandle::new(full))
    }

    async fn get_file(
        &self,
        dir: &DirectoryHandle,
        name: &str,
        options: FileOpenOptions,
    ) -> Result<FileHandle, FsError> {
        let path = dir.child(name);

        if !options.create {
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|e| FsError::from_io_error(&e, &path))?;
            if !metadata.is_file() {
                return Err(FsError::io(
                    "IsADirectory",
                    format!("{} is not a regular file", path.display()),
                ));
            }
            return Ok(FileHandle::new(path));
        }

        let mut open = OpenOptions::new();
        open.write(true);
        if options.exclusive {
            open.create_new(true);
        } else {
            open.create(true).truncate(true);
        }
        open.open(&path)
            .await
            .map_err(|e| FsError::from_io_error(&e, &path))?;
        Ok(FileHandle::new(path))
    }

    async fn remove_file(&self, file: &FileHandle) -> Result<(), FsError> {
        tokio::fs::remove_file(file.path())
            .await
            .map_err(|e| FsError::from_io_error(&e, file.path()))?;
        tracing::trace!(target: "bundlecache.fs", path = %file.path().display(), "File removed");
        Ok(())
    }

    fn resolve_url(&self, file: &FileHandle) -> String {
        Url::from_file_path(file.path()).map_or_else(
            |()| format!("file://{}", file.path().display()),
            |url| url.to_string(),
        )
    }
}
