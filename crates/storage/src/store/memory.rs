//! In-memory history store

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;
use crate::store::traits::{HistoryRecord, HistoryStore};

/// In-memory history store
///
/// Fast but non-persistent - history is lost when the process exits.
/// Used in tests and for dry runs.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with history
    pub fn with_records(records: Vec<HistoryRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn last_committed_price(&self, gpu_model: &str) -> StoreResult<Option<f64>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.gpu_model == gpu_model)
            .map(|r| r.index_price))
    }

    async fn append(&self, record: HistoryRecord) -> StoreResult<()> {
        let mut records = self.records.write().await;
        debug!(id = %record.id, price = record.index_price, "Appending history record");
        records.push(record);
        Ok(())
    }

    async fn recent(&self, gpu_model: &str, limit: usize) -> StoreResult<Vec<HistoryRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.gpu_model == gpu_model)
            .take(limit)
            .cloned()
            .collect())
    }
}
