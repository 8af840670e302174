//! In-memory document store used by tests and local development.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::RwLock;

use capstone_core::{ApiError, Result};
use futures::future::BoxFuture;
use serde_json::Value;

use super::{Document, DocumentStore, ListQuery, WriteOp};

/// A process-local store over a map keyed by `(collection, id)`.
///
/// Batches apply under a single write lock, which gives the same
/// all-or-nothing visibility the Postgres backend gets from a transaction.
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<(String, String), Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_err() -> ApiError {
        ApiError::Internal("Store lock poisoned".into())
    }

    /// Number of documents in one collection. Test helper.
    pub fn collection_len(&self, collection: &str) -> usize {
        self.documents
            .read()
            .map(|docs| {
                docs.iter()
                    .filter(|((c, _), _)| c == collection)
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Compare two JSON field values for ordering purposes. Strings (the
/// RFC 3339 timestamps) compare lexicographically, numbers numerically;
/// anything else falls back to the serialized form.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

impl DocumentStore for MemoryStore {
    fn get<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>>> {
        Box::pin(async move {
            let docs = self.documents.read().map_err(|_| Self::lock_err())?;
            Ok(docs
                .get(&(collection.to_string(), id.to_string()))
                .map(|body| Document {
                    id: id.to_string(),
                    body: body.clone(),
                }))
        })
    }

    fn put<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        body: Value,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut docs = self.documents.write().map_err(|_| Self::lock_err())?;
            docs.insert((collection.to_string(), id.to_string()), body);
            Ok(())
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut docs = self.documents.write().map_err(|_| Self::lock_err())?;
            docs.remove(&(collection.to_string(), id.to_string()));
            Ok(())
        })
    }

    fn list<'a>(
        &'a self,
        collection: &'a str,
        query: ListQuery,
    ) -> BoxFuture<'a, Result<Vec<Document>>> {
        Box::pin(async move {
            let docs = self.documents.read().map_err(|_| Self::lock_err())?;

            let mut matches: Vec<Document> = docs
                .iter()
                .filter(|((c, _), _)| c == collection)
                .filter(|(_, body)| {
                    query
                        .filters
                        .iter()
                        .all(|(field, value)| body.get(field) == Some(value))
                })
                .map(|((_, id), body)| Document {
                    id: id.clone(),
                    body: body.clone(),
                })
                .collect();

            if let Some(field) = &query.order_desc_by {
                matches.sort_by(|a, b| {
                    compare_values(b.body.get(field), a.body.get(field))
                });
            }

            if let Some(limit) = query.limit {
                matches.truncate(limit);
            }

            Ok(matches)
        })
    }

    fn batch<'a>(&'a self, ops: Vec<WriteOp>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            // One write lock for the whole batch.
            let mut docs = self.documents.write().map_err(|_| Self::lock_err())?;
            for op in ops {
                match op {
                    WriteOp::Put {
                        collection,
                        id,
                        body,
                    } => {
                        docs.insert((collection, id), body);
                    }
                    WriteOp::Delete { collection, id } => {
                        docs.remove(&(collection, id));
                    }
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = MemoryStore::new();

        store.put("users", "u1", json!({"name": "Amira"})).await.unwrap();
        let doc = store.get("users", "u1").await.unwrap().unwrap();
        assert_eq!(doc.body["name"], "Amira");

        store.delete("users", "u1").await.unwrap();
        assert!(store.get("users", "u1").await.unwrap().is_none());

        // Deleting again is a no-op.
        store.delete("users", "u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_filters_order_limit() {
        let store = MemoryStore::new();
        for (id, user, at) in [
            ("n1", "u1", "2024-01-01T00:00:00.000000000Z"),
            ("n2", "u1", "2024-03-01T00:00:00.000000000Z"),
            ("n3", "u2", "2024-02-01T00:00:00.000000000Z"),
            ("n4", "u1", "2024-02-01T00:00:00.000000000Z"),
        ] {
            store
                .put("notifications", id, json!({"user_id": user, "created_at": at}))
                .await
                .unwrap();
        }

        let docs = store
            .list(
                "notifications",
                ListQuery::new()
                    .filter("user_id", json!("u1"))
                    .order_desc("created_at")
                    .limit(2),
            )
            .await
            .unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["n2", "n4"]);
    }

    #[tokio::test]
    async fn test_batch_applies_all_writes() {
        let store = MemoryStore::new();
        store.put("projects", "p1", json!({"title": "t"})).await.unwrap();

        store
            .batch(vec![
                WriteOp::delete("projects", "p1"),
                WriteOp::put("projects", "p2", json!({"title": "t2"})),
            ])
            .await
            .unwrap();

        assert!(store.get("projects", "p1").await.unwrap().is_none());
        assert!(store.get("projects", "p2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_subcollections_are_distinct() {
        let store = MemoryStore::new();
        store
            .put("projects/p1/messages", "m1", json!({"content": "hi"}))
            .await
            .unwrap();

        assert!(store.get("projects", "m1").await.unwrap().is_none());
        assert_eq!(store.collection_len("projects/p1/messages"), 1);
    }
}
