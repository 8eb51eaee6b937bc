//! Index history storage
//!
//! This crate provides the append-only history the change gate reads
//! the last committed price from and appends accepted values to.
//!
//! # Feature Flags
//!
//! - `postgres` - Enable PostgreSQL storage

pub mod error;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::file::FileHistoryStore;
pub use store::memory::InMemoryHistoryStore;
pub use store::traits::{HistoryRecord, HistoryStore};

#[cfg(feature = "postgres")]
pub use store::postgres::PostgresHistoryStore;

use config::{StorageBackend, StorageConfig};
use std::sync::Arc;
use tracing::info;

/// Build the history store selected by the configuration
pub async fn open_store(config: &StorageConfig) -> StoreResult<Arc<dyn HistoryStore>> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory history store");
            Ok(Arc::new(InMemoryHistoryStore::new()))
        }
        StorageBackend::File => {
            info!(path = %config.path, "Using file history store");
            Ok(Arc::new(FileHistoryStore::new(&config.path)))
        }
        StorageBackend::Postgres => open_postgres(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(config: &StorageConfig) -> StoreResult<Arc<dyn HistoryStore>> {
    let url = config
        .database_url
        .as_deref()
        .ok_or_else(|| StoreError::Config("database_url is required".to_string()))?;

    info!(table = %config.table, "Using postgres history store");
    let store = PostgresHistoryStore::connect(url, config.table.clone()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_config: &StorageConfig) -> StoreResult<Arc<dyn HistoryStore>> {
    Err(StoreError::Config(
        "postgres backend requires the `postgres` feature".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_memory_store() {
        let config = StorageConfig {
            backend: StorageBackend::Memory,
            ..StorageConfig::default()
        };

        let store = open_store(&config).await.unwrap();
        assert_eq!(store.last_committed_price("A100").await.unwrap(), None);
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_postgres_without_feature_is_config_error() {
        let config = StorageConfig {
            backend: StorageBackend::Postgres,
            database_url: Some("postgres://localhost/index".to_string()),
            ..StorageConfig::default()
        };

        let err = open_store(&config).await.err().unwrap();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
