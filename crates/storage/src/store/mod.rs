//! Store module exports

pub mod traits;
pub mod memory;
pub mod file;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(test)]
pub(crate) fn test_record(price: f64) -> traits::HistoryRecord {
    traits::HistoryRecord {
        id: uuid::Uuid::new_v4(),
        recorded_at: chrono::Utc::now(),
        gpu_model: "A100".to_string(),
        index_price: price,
        anchor_component: price * 0.65,
        long_tail_component: price * 0.35,
        anchor_count: 4,
        long_tail_count: 8,
        previous_price: None,
        change_percent: 0.0,
        validation_passed: true,
        override_applied: false,
        raw: serde_json::json!({ "final_index_price": price }),
    }
}
