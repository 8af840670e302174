//! In-memory blob store for tests.

use std::collections::HashMap;
use std::sync::RwLock;

use capstone_core::{ApiError, Result};
use futures::future::BoxFuture;

use super::BlobStore;

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> ApiError {
        ApiError::Internal("Blob lock poisoned".into())
    }
}

impl BlobStore for MemoryBlobStore {
    fn exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<bool>> {
        Box::pin(async move {
            let objects = self.objects.read().map_err(|_| Self::lock_err())?;
            Ok(objects.contains_key(path))
        })
    }

    fn write<'a>(&'a self, path: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut objects = self.objects.write().map_err(|_| Self::lock_err())?;
            objects.insert(path.to_string(), bytes);
            Ok(())
        })
    }

    fn read<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let objects = self.objects.read().map_err(|_| Self::lock_err())?;
            objects
                .get(path)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("Object '{}' not found", path)))
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut objects = self.objects.write().map_err(|_| Self::lock_err())?;
            objects
                .remove(path)
                .map(|_| ())
                .ok_or_else(|| ApiError::NotFound(format!("Object '{}' not found", path)))
        })
    }
}
