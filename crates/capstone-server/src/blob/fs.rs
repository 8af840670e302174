//! Filesystem blob store.

use std::path::PathBuf;

use capstone_core::{ApiError, Result};
use futures::future::BoxFuture;

use super::{validate_path, BlobStore};

/// Blob store rooted at a local directory.
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        validate_path(path)?;
        Ok(self.root.join(path))
    }

    fn io_err(e: std::io::Error) -> ApiError {
        ApiError::Internal(format!("Blob IO error: {}", e))
    }
}

impl BlobStore for FsBlobStore {
    fn exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            Ok(tokio::fs::try_exists(&full).await.map_err(Self::io_err)?)
        })
    }

    fn write<'a>(&'a self, path: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            if let Some(parent) = full.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(Self::io_err)?;
            }
            tokio::fs::write(&full, bytes).await.map_err(Self::io_err)
        })
    }

    fn read<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            match tokio::fs::read(&full).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(ApiError::NotFound(format!("Object '{}' not found", path)))
                }
                Err(e) => Err(Self::io_err(e)),
            }
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            match tokio::fs::remove_file(&full).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(ApiError::NotFound(format!("Object '{}' not found", path)))
                }
                Err(e) => Err(Self::io_err(e)),
            }
        })
    }
}
