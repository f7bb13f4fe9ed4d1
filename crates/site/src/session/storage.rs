//! Per-browser key/value storage for admin session state.
//!
//! On the server this is the visitor's `tower_sessions::Session`; tests use
//! [`MemoryStorage`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tower_sessions::Session;

/// Errors raised by a [`ContextStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("session store error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value storage scoped to one browser context.
///
/// Values survive page reloads for as long as the browser keeps its session
/// cookie.
pub trait ContextStorage: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, StorageError>> + Send;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: String)
    -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Persist pending changes immediately.
    ///
    /// Only needed when a change happens after the response has started, for
    /// example inside an event stream.
    fn flush(&self) -> impl Future<Output = Result<(), StorageError>> + Send {
        async { Ok(()) }
    }
}

impl ContextStorage for Session {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(Self::get::<String>(self, key).await?)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        Ok(self.insert(key, value).await?)
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        Self::remove::<serde_json::Value>(self, key).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        Ok(self.save().await?)
    }
}

/// In-memory storage for tests and local tooling.
///
/// Clones share the same map, like two handles on one browser context.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no keys are stored.
    pub async fn is_empty(&self) -> bool {
        self.values.read().await.is_empty()
    }

    /// Whether the given key is present.
    pub async fn contains(&self, key: &str) -> bool {
        self.values.read().await.contains_key(key)
    }
}

impl ContextStorage for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.values.write().await.insert(key.to_owned(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.write().await.remove(key);
        Ok(())
    }
}
