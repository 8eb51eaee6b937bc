//! Change gate
//!
//! A newly computed index is committed to history only when it moves by
//! at most `max_change_percent` against the last committed value. Larger
//! moves are rejected unless an operator overrides the gate.

use config::GateConfig;
use storage::{HistoryRecord, HistoryStore};
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculator::round_price;
use crate::error::Result;
use crate::types::IndexResult;

/// Boundary tolerance; an exact threshold move must pass
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Gate decision details stored alongside a committed value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateMetadata {
    pub previous_price: Option<f64>,
    /// Rounded to 2 decimal places
    pub change_percent: f64,
    /// Whether the move was within the bound
    pub validation_passed: bool,
    pub override_applied: bool,
}

/// Result of submitting an index to the gate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateOutcome {
    Committed(GateMetadata),
    Rejected {
        new: f64,
        last: f64,
        change_percent: f64,
    },
}

impl GateOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, GateOutcome::Committed(_))
    }

    /// Label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            GateOutcome::Committed(meta) if meta.override_applied => "overridden",
            GateOutcome::Committed(_) => "committed",
            GateOutcome::Rejected { .. } => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeGate {
    max_change_percent: f64,
}

impl ChangeGate {
    pub fn new(max_change_percent: f64) -> Self {
        Self { max_change_percent }
    }

    pub fn from_config(config: &GateConfig) -> Self {
        Self::new(config.max_change_percent)
    }

    pub fn max_change_percent(&self) -> f64 {
        self.max_change_percent
    }

    /// Decide on a new price given the last committed one
    pub fn evaluate(&self, new_price: f64, last_price: Option<f64>, force: bool) -> GateOutcome {
        let last = match last_price {
            Some(last) if last != 0.0 => last,
            // First observation, or nothing to divide by
            _ => {
                return GateOutcome::Committed(GateMetadata {
                    previous_price: last_price,
                    change_percent: 0.0,
                    validation_passed: true,
                    override_applied: false,
                })
            }
        };

        let change = (new_price - last) / last * 100.0;
        let within = change.abs() <= self.max_change_percent + BOUNDARY_EPSILON;
        let change_percent = round_price(change);

        if within || force {
            GateOutcome::Committed(GateMetadata {
                previous_price: Some(last),
                change_percent,
                validation_passed: within,
                override_applied: !within,
            })
        } else {
            GateOutcome::Rejected {
                new: new_price,
                last,
                change_percent,
            }
        }
    }

    /// Gate an index against a store, appending it on commit
    ///
    /// Only history of `result.gpu_model` is compared against. The read and
    /// the append are separate store calls; only one gate transaction may
    /// run against a store at a time.
    pub async fn submit(
        &self,
        result: &IndexResult,
        store: &dyn HistoryStore,
        force: bool,
    ) -> Result<GateOutcome> {
        let last = store.last_committed_price(&result.gpu_model).await?;
        let outcome = self.evaluate(result.final_index_price, last, force);

        match outcome {
            GateOutcome::Committed(meta) => {
                store.append(history_record(result, &meta)?).await?;
                if meta.override_applied {
                    warn!(
                        price = result.final_index_price,
                        previous = ?meta.previous_price,
                        change_percent = meta.change_percent,
                        "Index committed with gate override"
                    );
                } else {
                    info!(
                        price = result.final_index_price,
                        previous = ?meta.previous_price,
                        change_percent = meta.change_percent,
                        "Index committed"
                    );
                }
            }
            GateOutcome::Rejected {
                new,
                last,
                change_percent,
            } => {
                warn!(
                    new,
                    last,
                    change_percent,
                    max_change_percent = self.max_change_percent,
                    "Index rejected by change gate"
                );
            }
        }

        Ok(outcome)
    }
}

/// History record for a committed index
///
/// The record is stamped with the time the index was computed, not the
/// time it was committed.
pub fn history_record(result: &IndexResult, meta: &GateMetadata) -> Result<HistoryRecord> {
    Ok(HistoryRecord {
        id: Uuid::new_v4(),
        recorded_at: result.timestamp,
        gpu_model: result.gpu_model.clone(),
        index_price: result.final_index_price,
        anchor_component: result.anchor_component,
        long_tail_component: result.long_tail_component,
        anchor_count: u32::try_from(result.anchor_count).unwrap_or(u32::MAX),
        long_tail_count: u32::try_from(result.long_tail_count).unwrap_or(u32::MAX),
        previous_price: meta.previous_price,
        change_percent: meta.change_percent,
        validation_passed: meta.validation_passed,
        override_applied: meta.override_applied,
        raw: serde_json::to_value(result)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use std::collections::BTreeMap;
    use storage::InMemoryHistoryStore;

    use crate::types::IndexParameters;
    use config::{AvailabilityMultipliers, DiscountBlendConfig};

    fn result(gpu_model: &str, price: f64) -> IndexResult {
        IndexResult {
            timestamp: Utc::now(),
            gpu_model: gpu_model.to_string(),
            final_index_price: price,
            anchor_component: price * 0.65,
            long_tail_component: price * 0.35,
            anchor_count: 4,
            long_tail_count: 2,
            anchor_details: Vec::new(),
            long_tail_details: Vec::new(),
            provider_availability: BTreeMap::new(),
            parameters: IndexParameters {
                anchor_share: 0.65,
                long_tail_share: 0.35,
                redistribute_missing_anchor_share: false,
                anchor_weights: BTreeMap::new(),
                anchor_discounts: BTreeMap::new(),
                discount_blend: DiscountBlendConfig::default(),
                availability_multipliers: AvailabilityMultipliers::default(),
            },
            exchange_rate: None,
        }
    }

    fn gate() -> ChangeGate {
        ChangeGate::from_config(&GateConfig::default())
    }

    #[test]
    fn test_first_observation_commits() {
        let outcome = gate().evaluate(1.76, None, false);
        assert_matches!(
            outcome,
            GateOutcome::Committed(GateMetadata {
                previous_price: None,
                change_percent,
                validation_passed: true,
                override_applied: false,
            }) if change_percent == 0.0
        );
    }

    #[test]
    fn test_zero_last_price_commits() {
        let outcome = gate().evaluate(1.76, Some(0.0), false);
        assert_matches!(outcome, GateOutcome::Committed(meta) if meta.change_percent == 0.0);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        assert!(gate().evaluate(120.00, Some(100.00), false).is_committed());
        assert!(gate().evaluate(80.00, Some(100.00), false).is_committed());

        assert_matches!(
            gate().evaluate(120.01, Some(100.00), false),
            GateOutcome::Rejected { new, last, change_percent }
                if new == 120.01 && last == 100.0 && change_percent == 20.01
        );
    }

    #[test]
    fn test_override() {
        let outcome = gate().evaluate(150.0, Some(100.0), true);
        assert_matches!(
            outcome,
            GateOutcome::Committed(GateMetadata {
                validation_passed: false,
                override_applied: true,
                ..
            })
        );
        assert_eq!(outcome.label(), "overridden");
    }

    #[test]
    fn test_force_within_bound_is_not_an_override() {
        let outcome = gate().evaluate(105.0, Some(100.0), true);
        assert_eq!(outcome.label(), "committed");
    }

    #[test]
    fn test_change_percent_is_rounded() {
        assert_matches!(
            gate().evaluate(1.80, Some(1.70), false),
            GateOutcome::Committed(meta) if meta.change_percent == 5.88
        );
    }

    #[test]
    fn test_custom_threshold() {
        let gate = ChangeGate::new(5.0);
        assert_eq!(gate.max_change_percent(), 5.0);
        assert!(!gate.evaluate(1.10, Some(1.0), false).is_committed());
    }

    #[tokio::test]
    async fn test_submit_compares_within_model() {
        let store = InMemoryHistoryStore::new();

        let a100 = gate().submit(&result("A100", 0.70), &store, false).await.unwrap();
        assert!(a100.is_committed());

        let h100 = gate().submit(&result("H100", 2.80), &store, false).await.unwrap();
        assert_matches!(
            h100,
            GateOutcome::Committed(GateMetadata {
                previous_price: None,
                ..
            })
        );

        assert_matches!(
            gate().submit(&result("A100", 2.80), &store, false).await.unwrap(),
            GateOutcome::Rejected { last, .. } if last == 0.70
        );
    }

    #[tokio::test]
    async fn test_record_keeps_computation_time() {
        let mut older = result("A100", 1.76);
        older.timestamp = Utc::now() - Duration::hours(6);

        let store = InMemoryHistoryStore::new();
        gate().submit(&older, &store, false).await.unwrap();

        let history = store.recent("A100", 1).await.unwrap();
        assert_eq!(history[0].recorded_at, older.timestamp);
    }
}
