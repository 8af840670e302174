use std::sync::Arc;

use capstone_core::config::StorageConfig;
use capstone_core::AuthContext;
use uuid::Uuid;

use crate::blob::{BlobStore, UrlSigner};
use crate::store::DocumentStore;

/// Shared service state: the injected store clients plus storage settings.
///
/// All clients are constructed explicitly at startup and passed in, so tests
/// substitute in-memory fakes without touching the operations.
#[derive(Clone)]
pub struct AppState {
    /// Document store.
    pub store: Arc<dyn DocumentStore>,
    /// Blob store for uploaded files.
    pub blobs: Arc<dyn BlobStore>,
    /// Signer for time-boxed blob URLs.
    pub signer: UrlSigner,
    /// Storage settings (URL lifetimes).
    pub storage: StorageConfig,
}

impl AppState {
    /// Create new service state.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        signer: UrlSigner,
        storage: StorageConfig,
    ) -> Self {
        Self {
            store,
            blobs,
            signer,
            storage,
        }
    }
}

/// Request metadata available to every operation.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    /// Unique request id for tracing.
    pub request_id: Uuid,
    /// Trace id propagated from the caller, if any.
    pub trace_id: String,
    /// Request timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl RequestMetadata {
    /// Create new request metadata.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            trace_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Create with a specific trace id.
    pub fn with_trace_id(trace_id: String) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            trace_id,
            timestamp: chrono::Utc::now(),
        }
    }
}

impl Default for RequestMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Execution context handed to each operation.
pub struct OpContext {
    /// Service state (stores, signer).
    pub state: Arc<AppState>,
    /// Caller identity.
    pub auth: AuthContext,
    /// Request metadata.
    pub meta: RequestMetadata,
}

impl OpContext {
    /// Create a new operation context.
    pub fn new(state: Arc<AppState>, auth: AuthContext, meta: RequestMetadata) -> Self {
        Self { state, auth, meta }
    }

    /// The document store.
    pub fn store(&self) -> &dyn DocumentStore {
        self.state.store.as_ref()
    }

    /// The blob store.
    pub fn blobs(&self) -> &dyn BlobStore {
        self.state.blobs.as_ref()
    }
}
