//! HistoryStore trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreResult;

/// One committed index value plus the gate metadata it was accepted with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub gpu_model: String,
    pub index_price: f64,
    pub anchor_component: f64,
    pub long_tail_component: f64,
    pub anchor_count: u32,
    pub long_tail_count: u32,
    /// Last committed price the gate compared against
    pub previous_price: Option<f64>,
    /// Change against `previous_price`, rounded to 2 dp
    pub change_percent: f64,
    /// Whether the change was within the gate bound
    pub validation_passed: bool,
    /// Whether an operator forced the value through the gate
    pub override_applied: bool,
    /// Full index result the value was computed from
    pub raw: serde_json::Value,
}

/// HistoryStore trait - append-only log of committed index values
///
/// Implementations are ordered by commit time. One store may hold the
/// history of several GPU models; reads are scoped to a single model.
/// The gate reads the last committed price and appends in two steps;
/// callers must ensure only one gate transaction runs against a store at
/// a time.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Price of the most recently committed record for `gpu_model`, if any
    async fn last_committed_price(&self, gpu_model: &str) -> StoreResult<Option<f64>>;

    /// Append a committed record
    async fn append(&self, record: HistoryRecord) -> StoreResult<()>;

    /// Most recent records for `gpu_model`, newest first
    async fn recent(&self, gpu_model: &str, limit: usize) -> StoreResult<Vec<HistoryRecord>>;
}
