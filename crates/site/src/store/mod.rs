//! Document storage for blog posts.
//!
//! Posts live in a keyed document collection (`blogs`), one JSON object per
//! post keyed by slug. [`DocumentStore`] is the raw collection seam;
//! [`BlogStore`] layers the post semantics on top of it (validation, soft
//! delete, tolerant reads).
//!
//! # Backends
//!
//! - [`PgDocumentStore`] - `PostgreSQL` `documents` table with a JSONB body
//! - [`MemoryDocumentStore`] - process memory, used for tests and local runs
//!
//! # Migrations
//!
//! Migrations are stored in `crates/site/migrations/` and run via:
//! ```bash
//! cargo run -p folio-cli -- migrate
//! ```

pub mod blog;
pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use blog::{
    BLOG_COLLECTION, BlogStore, BlogStoreError, ImportedPost, NewPost, SkipReason, StoredPost,
    coerce_author, coerce_instant, coerce_tags, normalize,
};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

/// Errors raised by a document store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend is not reachable or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A raw document as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// How [`DocumentStore::set`] treats an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite the whole document.
    Replace,
    /// Overwrite only the given top-level fields; create the document if missing.
    Merge,
}

/// A keyed collection of JSON documents.
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Fetch every document in a collection, ordered by id.
    fn list(&self, collection: &str)
    -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;

    /// Write a document.
    fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        mode: WriteMode,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Check that the backend is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The configured storage backend.
#[derive(Debug, Clone)]
pub enum DocumentBackend {
    Postgres(PgDocumentStore),
    Memory(MemoryDocumentStore),
}

impl DocumentStore for DocumentBackend {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        match self {
            Self::Postgres(store) => store.get(collection, id).await,
            Self::Memory(store) => store.get(collection, id).await,
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        match self {
            Self::Postgres(store) => store.list(collection).await,
            Self::Memory(store) => store.list(collection).await,
        }
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        match self {
            Self::Postgres(store) => store.set(collection, id, data, mode).await,
            Self::Memory(store) => store.set(collection, id, data, mode).await,
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(store) => store.ping().await,
            Self::Memory(store) => store.ping().await,
        }
    }
}

/// Shallow merge of `patch` into `target`. A non-object target is replaced.
pub(crate) fn merge_fields(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(existing), Value::Object(fields)) => {
            existing.extend(fields);
        }
        (target, patch) => *target = patch,
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
