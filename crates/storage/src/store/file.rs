//! JSON-lines history store
//!
//! Each committed record is one line of JSON appended to the file. The
//! last line written for a GPU model is that model's last committed
//! value; a missing file is an empty history.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::traits::{HistoryRecord, HistoryStore};

pub struct FileHistoryStore {
    path: PathBuf,
    /// Serializes appends from this process
    write_lock: Mutex<()>,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn read_all(&self) -> StoreResult<Vec<HistoryRecord>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "History file not found, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).map_err(|e| {
                    StoreError::Serialization(format!("{:?} line {}: {}", self.path, n + 1, e))
                })
            })
            .collect()
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn last_committed_price(&self, gpu_model: &str) -> StoreResult<Option<f64>> {
        let records = self.read_all().await?;
        Ok(records
            .iter()
            .rev()
            .find(|r| r.gpu_model == gpu_model)
            .map(|r| r.index_price))
    }

    async fn append(&self, record: HistoryRecord) -> StoreResult<()> {
        let mut line = serde_json::to_string(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        info!(
            path = ?self.path,
            id = %record.id,
            price = record.index_price,
            "History record appended"
        );
        Ok(())
    }

    async fn recent(&self, gpu_model: &str, limit: usize) -> StoreResult<Vec<HistoryRecord>> {
        let records = self.read_all().await?;
        Ok(records
            .into_iter()
            .rev()
            .filter(|r| r.gpu_model == gpu_model)
            .take(limit)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_record;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "gpu-index-{}-{}.jsonl",
            name,
            uuid::Uuid::new_v4()
        ))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let store = FileHistoryStore::new(temp_path("missing"));

        assert_eq!(store.last_committed_price("A100").await.unwrap(), None);
        assert!(store.recent("A100", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_then_read_back() {
        let path = temp_path("append");
        let store = FileHistoryStore::new(&path);

        let first = test_record(1.70);
        store.append(first.clone()).await.unwrap();
        store.append(test_record(1.76)).await.unwrap();

        assert_eq!(store.last_committed_price("A100").await.unwrap(), Some(1.76));

        // A fresh handle sees the same history
        let reopened = FileHistoryStore::new(&path);
        let recent = reopened.recent("A100", 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1], first);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_corrupt_line_is_reported() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json}\n").unwrap();

        let store = FileHistoryStore::new(&path);
        let err = store.last_committed_price("A100").await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn test_shared_file_is_read_per_model() {
        let path = temp_path("models");
        let store = FileHistoryStore::new(&path);

        let mut h100 = test_record(2.80);
        h100.gpu_model = "H100".to_string();
        store.append(test_record(0.70)).await.unwrap();
        store.append(h100).await.unwrap();

        assert_eq!(store.last_committed_price("A100").await.unwrap(), Some(0.70));
        assert_eq!(store.last_committed_price("H100").await.unwrap(), Some(2.80));
        assert_eq!(store.last_committed_price("B200").await.unwrap(), None);
        assert_eq!(store.recent("H100", 10).await.unwrap().len(), 1);

        let _ = std::fs::remove_file(&path);
    }
}
