use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::info;
use webring::Widget;

use super::{
    config::{Config, StorageBackend},
    database::{RedisStore, init_redis},
    storage::{BlobStore, MemoryStore},
    store::{Guestbook, Settings},
};

pub struct AppState {
    pub config: Config,
    pub guestbook: Guestbook,
    pub webring: Widget,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let store: Arc<dyn BlobStore> = match config.storage {
            StorageBackend::Memory => {
                info!("Using in-memory storage, entries will not survive a restart");
                Arc::new(MemoryStore::default())
            }
            StorageBackend::Redis => {
                info!("Connecting to Redis...");
                Arc::new(RedisStore::new(init_redis(&config.redis_url).await?))
            }
        };

        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn BlobStore>) -> Result<Arc<Self>> {
        let guestbook = Guestbook::new(store, Settings::from(&config));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.webring_timeout_ms))
            .build()?;
        let webring = Widget::new(client, &config.webring_url);

        Ok(Arc::new(Self {
            config,
            guestbook,
            webring,
        }))
    }
}
