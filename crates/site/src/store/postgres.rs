//! `PostgreSQL` document store.
//!
//! ## Table
//!
//! - `documents(collection, id, data JSONB, created_at, updated_at)`,
//!   primary key `(collection, id)`
//!
//! Merges use JSONB concatenation, which overwrites top-level keys only.

use serde_json::Value;
use sqlx::PgPool;

use super::{Document, DocumentStore, StoreError, WriteMode};

/// Document store backed by the `documents` table.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(String, Value)> = sqlx::query_as(
            r"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND id = $2
            ",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, data)| Document { id, data }))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows: Vec<(String, Value)> = sqlx::query_as(
            r"
            SELECT id, data
            FROM documents
            WHERE collection = $1
            ORDER BY id
            ",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, data)| Document { id, data })
            .collect())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let query = match mode {
            WriteMode::Replace => {
                r"
                INSERT INTO documents (collection, id, data)
                VALUES ($1, $2, $3)
                ON CONFLICT (collection, id) DO UPDATE
                SET data = EXCLUDED.data, updated_at = now()
                "
            }
            WriteMode::Merge => {
                r"
                INSERT INTO documents (collection, id, data)
                VALUES ($1, $2, $3)
                ON CONFLICT (collection, id) DO UPDATE
                SET data = CASE
                        WHEN jsonb_typeof(documents.data) = 'object'
                        THEN documents.data || EXCLUDED.data
                        ELSE EXCLUDED.data
                    END,
                    updated_at = now()
                "
            }
        };

        sqlx::query(query)
            .bind(collection)
            .bind(id)
            .bind(data)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
