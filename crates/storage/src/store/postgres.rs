//! PostgreSQL history store implementation

use async_trait::async_trait;
use sqlx::{postgres::PgPool, Row};
use std::sync::Arc;
use tracing::info;

use crate::error::{StoreError, StoreResult};
use crate::store::traits::{HistoryRecord, HistoryStore};

/// Count column value for a record count
fn to_db_count(count: u32, column: &str) -> StoreResult<i32> {
    i32::try_from(count)
        .map_err(|_| StoreError::Serialization(format!("{} out of range: {}", column, count)))
}

/// Record count for a count column value
fn from_db_count(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::Serialization(format!("{} out of range: {}", column, value)))
}

/// PostgreSQL history store
pub struct PostgresHistoryStore {
    pool: Arc<PgPool>,
    table: String,
}

impl PostgresHistoryStore {
    /// Create a store over an existing pool; `table` must be a plain identifier
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        Self {
            pool: Arc::new(pool),
            table: table.into(),
        }
    }

    /// Connect and make sure the history table exists
    pub async fn connect(database_url: &str, table: impl Into<String>) -> StoreResult<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self::new(pool, table);
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id UUID PRIMARY KEY,
                recorded_at TIMESTAMPTZ NOT NULL,
                gpu_model TEXT NOT NULL,
                index_price DOUBLE PRECISION NOT NULL,
                anchor_component DOUBLE PRECISION NOT NULL,
                long_tail_component DOUBLE PRECISION NOT NULL,
                anchor_count INTEGER NOT NULL,
                long_tail_count INTEGER NOT NULL,
                previous_price DOUBLE PRECISION,
                price_change_percent DOUBLE PRECISION NOT NULL,
                validation_passed BOOLEAN NOT NULL,
                override_applied BOOLEAN NOT NULL,
                raw_data JSONB NOT NULL
            )
            "#,
            self.table
        ))
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(table = %self.table, "History table ready");
        Ok(())
    }

    fn row_to_record(&self, row: &sqlx::postgres::PgRow) -> StoreResult<HistoryRecord> {
        let raw: String = row.get("raw_data");
        let anchor_count: i32 = row.get("anchor_count");
        let long_tail_count: i32 = row.get("long_tail_count");

        Ok(HistoryRecord {
            id: row.get("id"),
            recorded_at: row.get("recorded_at"),
            gpu_model: row.get("gpu_model"),
            index_price: row.get("index_price"),
            anchor_component: row.get("anchor_component"),
            long_tail_component: row.get("long_tail_component"),
            anchor_count: from_db_count(anchor_count, "anchor_count")?,
            long_tail_count: from_db_count(long_tail_count, "long_tail_count")?,
            previous_price: row.get("previous_price"),
            change_percent: row.get("price_change_percent"),
            validation_passed: row.get("validation_passed"),
            override_applied: row.get("override_applied"),
            raw: serde_json::from_str(&raw)
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
        })
    }
}

#[async_trait]
impl HistoryStore for PostgresHistoryStore {
    async fn last_committed_price(&self, gpu_model: &str) -> StoreResult<Option<f64>> {
        let row = sqlx::query(&format!(
            "SELECT index_price FROM {} WHERE gpu_model = $1 ORDER BY recorded_at DESC LIMIT 1",
            self.table
        ))
        .bind(gpu_model)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(row.map(|r| r.get::<f64, _>("index_price")))
    }

    async fn append(&self, record: HistoryRecord) -> StoreResult<()> {
        let anchor_count = to_db_count(record.anchor_count, "anchor_count")?;
        let long_tail_count = to_db_count(record.long_tail_count, "long_tail_count")?;

        sqlx::query(&format!(
            r#"
            INSERT INTO {} (
                id, recorded_at, gpu_model, index_price, anchor_component,
                long_tail_component, anchor_count, long_tail_count, previous_price,
                price_change_percent, validation_passed, override_applied, raw_data
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13::jsonb)
            "#,
            self.table
        ))
        .bind(record.id)
        .bind(record.recorded_at)
        .bind(&record.gpu_model)
        .bind(record.index_price)
        .bind(record.anchor_component)
        .bind(record.long_tail_component)
        .bind(anchor_count)
        .bind(long_tail_count)
        .bind(record.previous_price)
        .bind(record.change_percent)
        .bind(record.validation_passed)
        .bind(record.override_applied)
        .bind(record.raw.to_string())
        .execute(&*self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(
            table = %self.table,
            id = %record.id,
            price = record.index_price,
            "History record inserted"
        );
        Ok(())
    }

    async fn recent(&self, gpu_model: &str, limit: usize) -> StoreResult<Vec<HistoryRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT id, recorded_at, gpu_model, index_price, anchor_component,
                   long_tail_component, anchor_count, long_tail_count, previous_price,
                   price_change_percent, validation_passed, override_applied,
                   raw_data::text AS raw_data
            FROM {}
            WHERE gpu_model = $1
            ORDER BY recorded_at DESC
            LIMIT $2
            "#,
            self.table
        ))
        .bind(gpu_model)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(|row| self.row_to_record(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_convert_within_range() {
        assert_eq!(to_db_count(12, "anchor_count").unwrap(), 12);
        assert_eq!(from_db_count(12, "anchor_count").unwrap(), 12);
    }

    #[test]
    fn test_out_of_range_counts_are_errors() {
        let err = to_db_count(u32::MAX, "long_tail_count").unwrap_err();
        assert!(
            matches!(err, StoreError::Serialization(ref msg) if msg.contains("long_tail_count"))
        );

        let err = from_db_count(-1, "anchor_count").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
