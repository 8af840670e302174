//! Postgres-backed document store.
//!
//! Documents live in a single `documents` table keyed by
//! `(collection, id)` with a JSONB body. Equality filters use the `@>`
//! containment operator; batches run in one transaction.

use capstone_core::config::DatabaseConfig;
use capstone_core::{ApiError, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::{Document, DocumentStore, ListQuery, WriteOp};

/// Advisory lock key for schema setup, so concurrent instances don't race
/// the DDL.
const SCHEMA_LOCK_KEY: i64 = 0x6361_7073_746f_6e65; // "capstone"

fn db_err(e: sqlx::Error) -> ApiError {
    ApiError::Internal(format!("Database error: {}", e))
}

/// Document store over a Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the database configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.url)
            .await
            .map_err(db_err)?;
        Ok(Self::new(pool))
    }

    /// Create the `documents` table if it does not exist, serialized across
    /// instances with an advisory lock.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        let result = self.create_schema().await;

        // Always release the lock, even on error. A leaked session-level
        // lock would block every other instance's startup.
        if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
            .bind(SCHEMA_LOCK_KEY)
            .execute(&self.pool)
            .await
        {
            tracing::warn!("Failed to release schema lock: {}", e);
        }

        result
    }

    async fn create_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                body JSONB NOT NULL,
                PRIMARY KEY (collection, id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS documents_created_at_idx \
             ON documents (collection, (body->>'created_at'))",
        )
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }
}

impl DocumentStore for PgStore {
    fn get<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
    ) -> BoxFuture<'a, Result<Option<Document>>> {
        Box::pin(async move {
            let row = sqlx::query("SELECT body FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

            match row {
                Some(row) => {
                    let body: Value = row.try_get("body").map_err(db_err)?;
                    Ok(Some(Document {
                        id: id.to_string(),
                        body,
                    }))
                }
                None => Ok(None),
            }
        })
    }

    fn put<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        body: Value,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            sqlx::query(
                "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) \
                 ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body",
            )
            .bind(collection)
            .bind(id)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
            Ok(())
        })
    }

    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
            Ok(())
        })
    }

    fn list<'a>(
        &'a self,
        collection: &'a str,
        query: ListQuery,
    ) -> BoxFuture<'a, Result<Vec<Document>>> {
        Box::pin(async move {
            let filter_obj = Value::Object(query.filters.into_iter().collect());
            let has_filters = filter_obj
                .as_object()
                .map(|o| !o.is_empty())
                .unwrap_or(false);

            let mut sql = String::from("SELECT id, body FROM documents WHERE collection = $1");
            let mut next_param = 2;

            if has_filters {
                sql.push_str(&format!(" AND body @> ${}", next_param));
                next_param += 1;
            }
            if query.order_desc_by.is_some() {
                sql.push_str(&format!(" ORDER BY body->>${}::text DESC", next_param));
                next_param += 1;
            }
            if query.limit.is_some() {
                sql.push_str(&format!(" LIMIT ${}", next_param));
            }

            let mut q = sqlx::query(&sql).bind(collection);
            if has_filters {
                q = q.bind(filter_obj);
            }
            if let Some(field) = query.order_desc_by {
                q = q.bind(field);
            }
            if let Some(limit) = query.limit {
                q = q.bind(limit as i64);
            }

            let rows = q.fetch_all(&self.pool).await.map_err(db_err)?;

            rows.into_iter()
                .map(|row| {
                    let id: String = row.try_get("id").map_err(db_err)?;
                    let body: Value = row.try_get("body").map_err(db_err)?;
                    Ok(Document { id, body })
                })
                .collect()
        })
    }

    fn batch<'a>(&'a self, ops: Vec<WriteOp>) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(db_err)?;

            for op in ops {
                match op {
                    WriteOp::Put {
                        collection,
                        id,
                        body,
                    } => {
                        sqlx::query(
                            "INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3) \
                             ON CONFLICT (collection, id) DO UPDATE SET body = EXCLUDED.body",
                        )
                        .bind(collection)
                        .bind(id)
                        .bind(body)
                        .execute(&mut *tx)
                        .await
                        .map_err(db_err)?;
                    }
                    WriteOp::Delete { collection, id } => {
                        sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
                            .bind(collection)
                            .bind(id)
                            .execute(&mut *tx)
                            .await
                            .map_err(db_err)?;
                    }
                }
            }

            tx.commit().await.map_err(db_err)
        })
    }
}
