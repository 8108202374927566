//! Raw file storage for uploaded PDFs.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors returned by blob store backends.
#[derive(Debug, Error)]
pub enum BlobError {
    /// No blob exists at the path.
    #[error("Blob not found: {}", .0.display())]
    NotFound(PathBuf),
    /// Filesystem access failed for another reason.
    #[error("Blob I/O failed for {}: {source}", .path.display())]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    fn from_io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == ErrorKind::NotFound {
            Self::NotFound(path.to_path_buf())
        } else {
            Self::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Persistence backend for raw document bytes.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `name`, returning the path the blob can be read back from.
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, BlobError>;

    /// Read a blob previously returned by [`BlobStore::save`].
    async fn read(&self, path: &Path) -> Result<Vec<u8>, BlobError>;

    /// Delete a blob.
    async fn delete(&self, path: &Path) -> Result<(), BlobError>;
}

/// Blob store writing files into a single directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Create a store rooted at `root`. The directory is created lazily on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, name: &str, bytes: &[u8]) -> Result<PathBuf, BlobError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| BlobError::from_io(&self.root, source))?;
        let path = self.root.join(name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| BlobError::from_io(&path, source))?;
        tracing::debug!(path = %path.display(), size = bytes.len(), "Blob saved");
        Ok(path)
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, BlobError> {
        tokio::fs::read(path)
            .await
            .map_err(|source| BlobError::from_io(path, source))
    }

    async fn delete(&self, path: &Path) -> Result<(), BlobError> {
        tokio::fs::remove_file(path)
            .await
            .map_err(|source| BlobError::from_io(path, source))
    }
}
