use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::{Config, StorageBackend};
use crate::store::{AttendanceRepository, JsonFileStore, MySqlStore, UserRepository};

/// Both repositories, usually backed by the same store.
#[derive(Clone)]
pub struct Stores {
    pub attendance: Arc<dyn AttendanceRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Stores {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: AttendanceRepository + UserRepository + 'static,
    {
        Self {
            attendance: store.clone(),
            users: store,
        }
    }
}

pub async fn init_store(config: &Config) -> Result<Stores> {
    match config.storage {
        StorageBackend::Json => {
            let store = JsonFileStore::open(&config.json_db_path)
                .await
                .with_context(|| format!("Failed to open JSON store at {}", config.json_db_path))?;
            info!(path = %store.path().display(), "Using JSON file store");
            Ok(Stores::shared(Arc::new(store)))
        }
        StorageBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORAGE_BACKEND=mysql")?;
            let store = MySqlStore::connect(url)
                .await
                .context("Failed to connect to database")?;
            store
                .ensure_schema()
                .await
                .context("Failed to prepare database schema")?;
            info!("Using MySQL store");
            Ok(Stores::shared(Arc::new(store)))
        }
    }
}
