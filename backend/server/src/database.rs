//! # Redis
//!
//! Persisted blob store.
//!
//! ## Layout
//!
//! - `entries`: plain string key holding the JSON entry array, at most 1000 entries
//! - `rate_limit_<address>`: string key holding `{"timestamp": ...}`, set with `PX` so it expires with the cooldown
//!
//! ## Notes
//!
//! Submissions do a read-modify-write on `entries` without `WATCH`. Two
//! submissions landing at the same moment can drop one of the appends. The
//! traffic of a personal guestbook makes that acceptable.
use std::time::Duration;

use async_trait::async_trait;
use redis::{
    AsyncCommands, Client, RedisError,
    aio::{ConnectionManager, ConnectionManagerConfig},
};

use crate::{error::StorageError, storage::BlobStore};

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;

    client.get_connection_manager_with_config(config).await
}

pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl BlobStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut connection = self.connection.clone();

        Ok(connection.get(key).await?)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();

        connection.set::<_, _, ()>(key, value).await?;

        Ok(())
    }

    async fn set_expiring(&self, key: &str, value: String, ttl: Duration) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();

        // SET key value PX ttl
        connection
            .pset_ex::<_, _, ()>(key, value, ttl.as_millis().max(1) as u64)
            .await?;

        Ok(())
    }
}
