//! # Redis
//!
//! Primary document store.
//!
//! ## Implementation
//!
//! - One Redis hash per collection: `HSET feast:<collection> <id> <json>`
//! - Collection scans use `HGETALL`, fine for menus and order books of a
//!   single storefront
//! - Unique indexes use `HSETNX`, the only atomic operation we rely on
//! - The connection manager reconnects on its own; a failed command surfaces
//!   as a 500 for that request only
use std::collections::HashMap;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use tracing::info;

use super::{Store, StoreError};

const PREFIX: &str = "feast";

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let config = ConnectionManagerConfig::new().set_number_of_retries(1);

        let client = Client::open(redis_url)?;
        let connection = client.get_connection_manager_with_config(config).await?;

        info!("Connected to Redis");

        Ok(Self { connection })
    }
}

fn collection_key(collection: &str) -> String {
    format!("{PREFIX}:{collection}")
}

fn index_key(index: &str) -> String {
    format!("{PREFIX}:index:{index}")
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.hget(collection_key(collection), id).await?)
    }

    async fn put(&self, collection: &str, id: &str, document: String) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        connection
            .hset::<_, _, _, ()>(collection_key(collection), id, document)
            .await?;

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let removed: i64 = connection.hdel(collection_key(collection), id).await?;

        Ok(removed > 0)
    }

    async fn entries(&self, collection: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut connection = self.connection.clone();
        let documents: HashMap<String, String> =
            connection.hgetall(collection_key(collection)).await?;

        Ok(documents.into_iter().collect())
    }

    async fn claim(&self, index: &str, key: &str, id: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.hset_nx(index_key(index), key, id).await?)
    }

    async fn lookup(&self, index: &str, key: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.hget(index_key(index), key).await?)
    }

    async fn release(&self, index: &str, key: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();

        connection.hdel::<_, _, ()>(index_key(index), key).await?;

        Ok(())
    }
}
