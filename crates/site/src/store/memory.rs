//! In-memory document store.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, StoreError, WriteMode, merge_fields};

type Collection = BTreeMap<String, Value>;

/// Document store kept in process memory.
///
/// Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Collection>>>,
}

impl MemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection, including soft-deleted ones.
    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Insert a raw value as-is, bypassing any write rules. Test seeding helper.
    pub async fn insert_raw(&self, collection: &str, id: &str, data: Value) {
        self.collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), data);
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|data| Document {
                id: id.to_owned(),
                data: data.clone(),
            }))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        mode: WriteMode,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_owned()).or_default();

        match docs.entry(id.to_owned()) {
            Entry::Occupied(mut entry) if mode == WriteMode::Merge => {
                merge_fields(entry.get_mut(), data);
            }
            Entry::Occupied(mut entry) => {
                entry.insert(data);
            }
            Entry::Vacant(entry) => {
                entry.insert(data);
            }
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_replace_and_merge() {
        let store = MemoryDocumentStore::new();
        store
            .set("c", "a", json!({"x": 1, "y": 2}), WriteMode::Replace)
            .await
            .unwrap();
        store
            .set("c", "a", json!({"y": 3}), WriteMode::Merge)
            .await
            .unwrap();
        assert_eq!(
            store.get("c", "a").await.unwrap().unwrap().data,
            json!({"x": 1, "y": 3})
        );

        store
            .set("c", "a", json!({"z": 0}), WriteMode::Replace)
            .await
            .unwrap();
        assert_eq!(store.get("c", "a").await.unwrap().unwrap().data, json!({"z": 0}));
    }

    #[tokio::test]
    async fn test_merge_creates_missing() {
        let store = MemoryDocumentStore::new();
        store
            .set("c", "new", json!({"deleted": true}), WriteMode::Merge)
            .await
            .unwrap();
        assert_eq!(store.len("c").await, 1);
    }

    #[tokio::test]
    async fn test_list_is_ordered_and_scoped() {
        let store = MemoryDocumentStore::new();
        store.insert_raw("c", "b", json!({})).await;
        store.insert_raw("c", "a", json!({})).await;
        store.insert_raw("other", "z", json!({})).await;

        let ids: Vec<String> = store
            .list("c")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(store.list("missing").await.unwrap().is_empty());
    }
}
