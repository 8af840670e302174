//! Blob store abstraction and signed-URL minting.
//!
//! Uploaded bytes never pass through the operation layer: an operation
//! mints a short-lived signed write URL, the client PUTs directly against
//! the blob endpoint, then confirms. Object paths have the shape
//! `files/{file_id}/{file_name}`.

mod fs;
mod memory;
mod signer;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;
pub use signer::{UrlScope, UrlSigner};

use capstone_core::{ApiError, Result};
use futures::future::BoxFuture;

/// Build the object path for an uploaded file.
pub fn file_path(file_id: &str, file_name: &str) -> String {
    format!("files/{}/{}", file_id, file_name)
}

/// Reject paths that escape the store root or are otherwise malformed.
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty()
        || path.starts_with('/')
        || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(ApiError::InvalidArgument(format!(
            "Invalid object path '{}'",
            path
        )));
    }
    Ok(())
}

/// The blob store seam.
pub trait BlobStore: Send + Sync {
    /// Whether an object exists at the given path.
    fn exists<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<bool>>;

    /// Write an object, replacing any existing one.
    fn write<'a>(&'a self, path: &'a str, bytes: Vec<u8>) -> BoxFuture<'a, Result<()>>;

    /// Read an object's bytes, `not-found` if absent.
    fn read<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>>>;

    /// Delete an object, `not-found` if absent.
    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<()>>;
}
