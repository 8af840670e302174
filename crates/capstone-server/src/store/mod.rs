//! Document store abstraction.
//!
//! The platform's data lives in flat collections of JSON documents queried
//! with equality/ordering/limit predicates only. The trait is the seam that
//! lets operations run against Postgres in production and an in-memory map
//! in tests; multi-document atomicity is provided solely by [`WriteOp`]
//! batches, which commit all-or-nothing within one call.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use capstone_core::{ApiError, Result};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Collection names used by the platform.
pub mod collections {
    pub const USERS: &str = "users";
    pub const PROJECTS: &str = "projects";
    pub const CHATBOT: &str = "chatbot";
    pub const NOTIFICATIONS: &str = "notifications";
    pub const FILES: &str = "files";

    /// Sub-collection of messages nested under one project.
    pub fn project_messages(project_id: &str) -> String {
        format!("{}/{}/messages", PROJECTS, project_id)
    }
}

/// A stored document with its id.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub body: Value,
}

impl Document {
    /// Decode the body into a typed document.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        serde_json::from_value(self.body)
            .map_err(|e| ApiError::Internal(format!("Malformed document: {}", e)))
    }
}

/// A single write in an atomic batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Put {
        collection: String,
        id: String,
        body: Value,
    },
    Delete {
        collection: String,
        id: String,
    },
}

impl WriteOp {
    pub fn put(collection: impl Into<String>, id: impl Into<String>, body: Value) -> Self {
        WriteOp::Put {
            collection: collection.into(),
            id: id.into(),
            body,
        }
    }

    pub fn delete(collection: impl Into<String>, id: impl Into<String>) -> Self {
        WriteOp::Delete {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// Query over one collection: equality filters, optional descending order
/// field, optional limit.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: Vec<(String, Value)>,
    pub order_desc_by: Option<String>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality filter on a top-level field.
    pub fn filter(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    /// Order descending by a top-level field (newest first for timestamps).
    pub fn order_desc(mut self, field: impl Into<String>) -> Self {
        self.order_desc_by = Some(field.into());
        self
    }

    /// Limit the number of returned documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// The document store seam.
///
/// Per-document writes are atomic on their own; `batch` extends that to a
/// set of writes within one invocation. Nothing here locks across calls:
/// concurrent read-modify-write sequences on the same document are
/// last-writer-wins by design of the underlying stores.
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by id.
    fn get<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>>>;

    /// Create or replace one document.
    fn put<'a>(&'a self, collection: &'a str, id: &'a str, body: Value)
        -> BoxFuture<'a, Result<()>>;

    /// Delete one document. Deleting a missing document is not an error.
    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<()>>;

    /// List documents matching a query.
    fn list<'a>(&'a self, collection: &'a str, query: ListQuery)
        -> BoxFuture<'a, Result<Vec<Document>>>;

    /// Apply a set of writes atomically: all commit or none do.
    fn batch<'a>(&'a self, ops: Vec<WriteOp>) -> BoxFuture<'a, Result<()>>;
}

/// Fetch and decode one document, mapped to `not-found` with the given
/// label when absent.
pub async fn fetch_required<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &str,
    id: &str,
    label: &str,
) -> Result<T> {
    store
        .get(collection, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{} '{}' not found", label, id)))?
        .decode()
}
