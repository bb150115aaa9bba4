use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreError};

/// Process-local store for development and tests. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, HashMap<String, String>>>,
}

fn index_key(index: &str) -> String {
    format!("index:{index}")
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<String>, StoreError> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn put(&self, collection: &str, id: &str, document: String) -> Result<(), StoreError> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), document);

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;

        Ok(collections
            .get_mut(collection)
            .and_then(|documents| documents.remove(id))
            .is_some())
    }

    async fn entries(&self, collection: &str) -> Result<Vec<(String, String)>, StoreError> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .map(|(id, raw)| (id.clone(), raw.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn claim(&self, index: &str, key: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let entries = collections.entry(index_key(index)).or_default();

        if entries.contains_key(key) {
            return Ok(false);
        }

        entries.insert(key.to_string(), id.to_string());
        Ok(true)
    }

    async fn lookup(&self, index: &str, key: &str) -> Result<Option<String>, StoreError> {
        self.get(&index_key(index), key).await
    }

    async fn release(&self, index: &str, key: &str) -> Result<(), StoreError> {
        self.delete(&index_key(index), key).await.map(|_| ())
    }
}
