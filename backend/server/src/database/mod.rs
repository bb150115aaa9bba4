//! # Document Store
//!
//! Every collection is one hash of `id -> JSON document`, which maps directly
//! onto a Redis hash and onto a nested map in memory.
//!
//! ## Keys
//!
//! - `feast:<collection>`: documents, e.g. `feast:orders`
//! - `feast:index:<name>`: unique indexes, e.g. `feast:index:email` maps a
//!   lower-cased email to a user id
//!
//! ## Consistency
//!
//! Reads and writes are plain read-then-write sequences with no transactions.
//! Two writers updating the same cart or order race and the last one wins.
//! The only atomic operation is [`Store::claim`], which backs email uniqueness.
use std::sync::Arc;

use async_trait::async_trait;
use pantry::Document;
use thiserror::Error;

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

pub const EMAIL_INDEX: &str = "email";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Corrupt document {collection}/{id}: {source}")]
    Corrupt {
        collection: &'static str,
        id: String,
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<String>, StoreError>;

    async fn put(&self, collection: &str, id: &str, document: String) -> Result<(), StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    async fn entries(&self, collection: &str) -> Result<Vec<(String, String)>, StoreError>;

    /// Atomically binds `key` to `id` unless the key is already bound.
    async fn claim(&self, index: &str, key: &str, id: &str) -> Result<bool, StoreError>;

    async fn lookup(&self, index: &str, key: &str) -> Result<Option<String>, StoreError>;

    async fn release(&self, index: &str, key: &str) -> Result<(), StoreError>;
}

/// Typed access to the store.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn Store>,
}

impl Database {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    pub async fn get<T: Document>(&self, id: &str) -> Result<Option<T>, StoreError> {
        self.store
            .get(T::COLLECTION, id)
            .await?
            .map(|raw| decode(id, &raw))
            .transpose()
    }

    pub async fn save<T: Document>(&self, document: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(document)?;

        self.store.put(T::COLLECTION, document.id(), raw).await
    }

    pub async fn remove<T: Document>(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }

    pub async fn all<T: Document>(&self) -> Result<Vec<T>, StoreError> {
        self.store
            .entries(T::COLLECTION)
            .await?
            .iter()
            .map(|(id, raw)| decode(id, raw))
            .collect()
    }

    /// Full collection scan, the store has no secondary indexes.
    pub async fn find<T, F>(&self, predicate: F) -> Result<Vec<T>, StoreError>
    where
        T: Document,
        F: Fn(&T) -> bool,
    {
        let mut documents = self.all::<T>().await?;
        documents.retain(|document| predicate(document));

        Ok(documents)
    }

    pub async fn claim(&self, index: &str, key: &str, id: &str) -> Result<bool, StoreError> {
        self.store.claim(index, key, id).await
    }

    pub async fn lookup(&self, index: &str, key: &str) -> Result<Option<String>, StoreError> {
        self.store.lookup(index, key).await
    }

    pub async fn release(&self, index: &str, key: &str) -> Result<(), StoreError> {
        self.store.release(index, key).await
    }
}

fn decode<T: Document>(id: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|source| StoreError::Corrupt {
        collection: T::COLLECTION,
        id: id.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use pantry::{Cart, NewRestaurant, Restaurant};

    use super::*;

    fn restaurant(name: &str) -> Restaurant {
        Restaurant::new(NewRestaurant {
            name: name.into(),
            description: String::new(),
            address: String::new(),
            cuisine: "thai".into(),
            image_url: None,
            owner_id: None,
            is_open: None,
        })
    }

    #[tokio::test]
    async fn save_then_get_returns_document() {
        let db = Database::in_memory();
        let saved = restaurant("Baan");
        db.save(&saved).await.unwrap();

        let loaded: Restaurant = db.get(&saved.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Baan");
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let db = Database::in_memory();
        let saved = restaurant("Baan");
        db.save(&saved).await.unwrap();

        assert!(db.get::<Cart>(&saved.id).await.unwrap().is_none());
        assert_eq!(db.all::<Restaurant>().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_filters_documents() {
        let db = Database::in_memory();
        db.save(&restaurant("Baan")).await.unwrap();
        db.save(&restaurant("Soi")).await.unwrap();

        let found = db.find(|r: &Restaurant| r.name == "Soi").await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn remove_reports_missing_documents() {
        let db = Database::in_memory();
        let saved = restaurant("Baan");
        db.save(&saved).await.unwrap();

        assert!(db.remove::<Restaurant>(&saved.id).await.unwrap());
        assert!(!db.remove::<Restaurant>(&saved.id).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_documents_surface_as_errors() {
        let store = Arc::new(MemoryStore::default());
        store.put("restaurants", "r1", "{not json".into()).await.unwrap();

        let db = Database::new(store);
        assert!(matches!(
            db.get::<Restaurant>("r1").await,
            Err(StoreError::Corrupt { collection: "restaurants", .. })
        ));
    }
}
