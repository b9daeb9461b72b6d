//! # Storage
//!
//! Key-value seam between the guestbook and wherever its blobs live.
//!
//! Two keys matter:
//! - `entries`: the whole entry collection as one JSON array
//! - `rate_limit_<address>`: last accepted submission for one submitter, expires after the cooldown
//!
//! The backend is picked once at startup from `STORAGE_BACKEND` and handed to
//! the store service, see [`crate::state::AppState::new`].
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageError;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Like [`BlobStore::set`], but the key disappears once `ttl` has passed.
    async fn set_expiring(&self, key: &str, value: String, ttl: Duration) -> Result<(), StorageError>;
}

struct Blob {
    value: String,
    expires_at: Option<Instant>,
}

impl Blob {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Process-local store for development and tests. Nothing survives a restart.
///
/// Expired keys are hidden on read and swept on every expiring write.
#[derive(Default)]
pub struct MemoryStore {
    blobs: RwLock<HashMap<String, Blob>>,
}

impl MemoryStore {
    async fn insert(&self, key: &str, value: String, expires_at: Option<Instant>) {
        self.blobs
            .write()
            .await
            .insert(key.to_string(), Blob { value, expires_at });
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let now = Instant::now();

        Ok(self
            .blobs
            .read()
            .await
            .get(key)
            .filter(|blob| blob.is_live(now))
            .map(|blob| blob.value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.insert(key, value, None).await;

        Ok(())
    }

    async fn set_expiring(&self, key: &str, value: String, ttl: Duration) -> Result<(), StorageError> {
        let now = Instant::now();

        self.blobs.write().await.retain(|_, blob| blob.is_live(now));
        self.insert(key, value, Some(now + ttl)).await;

        Ok(())
    }
}
