//! Index engine and pipeline
//!
//! [`IndexEngine`] runs one aggregation pass over a report snapshot.
//! [`IndexPipeline`] couples an engine with the change gate and a history
//! store.

use chrono::Utc;
use common::{Cohort, PriceReport};
use config::IndexConfig;
use observability::IndexMetrics;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use storage::HistoryStore;
use tracing::{debug, info, warn};

use crate::calculator::{combine, AnchorQuote, LongTailQuote};
use crate::classifier::classify;
use crate::error::{IndexError, Result};
use crate::fx::{CurrencyNormalizer, RateProvider};
use crate::gate::{ChangeGate, GateOutcome};
use crate::types::{IndexParameters, IndexResult, RateOrigin};

/// Computes index values for one GPU model
///
/// Holds immutable configuration only; every call to [`compute`] gets
/// its own exchange-rate cache.
///
/// [`compute`]: IndexEngine::compute
pub struct IndexEngine {
    config: Arc<IndexConfig>,
    rates: RateProvider,
    metrics: IndexMetrics,
}

impl IndexEngine {
    pub fn new(config: Arc<IndexConfig>, rates: RateProvider) -> Self {
        let metrics = IndexMetrics::new(&config.index.gpu_model);
        Self {
            config,
            rates,
            metrics,
        }
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn metrics(&self) -> &IndexMetrics {
        &self.metrics
    }

    /// Run one aggregation pass
    ///
    /// Reports with a non-positive or non-finite price are dropped. If no
    /// report survives, no index is produced.
    pub async fn compute(&self, reports: &[PriceReport]) -> Result<IndexResult> {
        let started = Instant::now();

        let usable: Vec<&PriceReport> = reports
            .iter()
            .filter(|report| match report.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!(provider = %report.provider_name, error = %e, "Dropping report");
                    false
                }
            })
            .collect();

        let dropped = reports.len() - usable.len();
        if dropped > 0 {
            self.metrics.record_dropped_reports(dropped);
        }
        if usable.is_empty() {
            self.metrics.record_failure();
            return Err(IndexError::NoUsableReports { dropped });
        }

        let normalizer = CurrencyNormalizer::new(&self.rates);
        let mut anchors: Vec<AnchorQuote> = Vec::new();
        let mut long_tail: Vec<LongTailQuote> = Vec::new();

        for report in usable {
            let classification = classify(&report.provider_name, &self.config.anchors);
            let price = normalizer
                .to_reference(report.canonical_price(), report.currency)
                .await;
            debug!(
                provider = %report.provider_name,
                cohort = %classification.cohort,
                key = %classification.key,
                price,
                "Classified report"
            );

            match classification.cohort {
                Cohort::Anchor => upsert(
                    &mut anchors,
                    AnchorQuote {
                        anchor: classification.key,
                        provider_name: report.provider_name.clone(),
                        price,
                        availability: report.availability,
                    },
                    |q| &q.anchor,
                ),
                Cohort::LongTail => upsert(
                    &mut long_tail,
                    LongTailQuote {
                        provider_name: classification.key,
                        price,
                        availability: report.availability,
                        gpu_count: report.gpu_count,
                    },
                    |q| &q.provider_name,
                ),
            }
        }

        let combined = combine(&anchors, &long_tail, &self.config);
        let exchange_rate = normalizer.rate();
        if exchange_rate.is_some_and(|rate| rate.origin == RateOrigin::Default) {
            self.metrics.record_rate_fallback();
        }

        let provider_availability = combined
            .anchor_details
            .iter()
            .map(|d| (d.provider_name.clone(), d.availability))
            .chain(
                combined
                    .long_tail_details
                    .iter()
                    .map(|d| (d.provider_name.clone(), d.availability)),
            )
            .collect();

        let result = IndexResult {
            timestamp: Utc::now(),
            gpu_model: self.config.index.gpu_model.clone(),
            final_index_price: combined.final_index_price,
            anchor_component: combined.anchor_component,
            long_tail_component: combined.long_tail_component,
            anchor_count: combined.anchor_details.len(),
            long_tail_count: combined.long_tail_details.len(),
            anchor_details: combined.anchor_details,
            long_tail_details: combined.long_tail_details,
            provider_availability,
            parameters: self.parameters(),
            exchange_rate,
        };

        self.metrics
            .record_run(started.elapsed(), result.final_index_price);
        info!(
            gpu_model = %result.gpu_model,
            price = result.final_index_price,
            anchor_component = result.anchor_component,
            long_tail_component = result.long_tail_component,
            anchors = result.anchor_count,
            long_tail = result.long_tail_count,
            "Index computed"
        );

        Ok(result)
    }

    fn parameters(&self) -> IndexParameters {
        let anchors = &self.config.anchors;
        IndexParameters {
            anchor_share: self.config.index.anchor_share,
            long_tail_share: self.config.index.long_tail_share,
            redistribute_missing_anchor_share: self.config.index.redistribute_missing_anchor_share,
            anchor_weights: anchors.iter().map(|a| (a.id.clone(), a.weight)).collect(),
            anchor_discounts: anchors.iter().map(|a| (a.id.clone(), a.discount)).collect(),
            discount_blend: self.config.discount_blend,
            availability_multipliers: self.config.long_tail.availability_multipliers,
        }
    }
}

/// Insert a quote, replacing an earlier one with the same key
fn upsert<T>(quotes: &mut Vec<T>, quote: T, key: impl Fn(&T) -> &String) {
    match quotes.iter().position(|q| key(q) == key(&quote)) {
        Some(index) => {
            warn!(key = %key(&quote), "Duplicate report, later report replaces earlier");
            quotes[index] = quote;
        }
        None => quotes.push(quote),
    }
}

/// Outcome of a compute-and-commit run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub result: IndexResult,
    pub gate: GateOutcome,
}

/// Engine plus change gate plus history
pub struct IndexPipeline {
    engine: IndexEngine,
    gate: ChangeGate,
    store: Arc<dyn HistoryStore>,
}

impl IndexPipeline {
    pub fn new(engine: IndexEngine, gate: ChangeGate, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            engine,
            gate,
            store,
        }
    }

    /// Build a pipeline from configuration
    pub fn from_config(
        config: Arc<IndexConfig>,
        rates: RateProvider,
        store: Arc<dyn HistoryStore>,
    ) -> Self {
        let gate = ChangeGate::from_config(&config.gate);
        Self::new(IndexEngine::new(config, rates), gate, store)
    }

    pub fn engine(&self) -> &IndexEngine {
        &self.engine
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    /// Compute an index and submit it to the gate
    pub async fn run(&self, reports: &[PriceReport], force: bool) -> Result<RunOutcome> {
        let result = self.engine.compute(reports).await?;
        let gate = self.push(&result, force).await?;
        Ok(RunOutcome { result, gate })
    }

    /// Submit an already computed index to the gate
    pub async fn push(&self, result: &IndexResult, force: bool) -> Result<GateOutcome> {
        let outcome = self.gate.submit(result, self.store.as_ref(), force).await?;
        self.engine.metrics().record_gate_outcome(outcome.label());
        Ok(outcome)
    }

    /// Most recent committed records of this pipeline's GPU model, newest first
    pub async fn history(&self, limit: usize) -> Result<Vec<storage::HistoryRecord>> {
        let gpu_model = &self.engine.config().index.gpu_model;
        Ok(self.store.recent(gpu_model, limit).await?)
    }
}

/// Number of providers at each availability level
pub fn availability_summary(result: &IndexResult) -> BTreeMap<String, usize> {
    let mut summary = BTreeMap::new();
    for availability in result.provider_availability.values() {
        *summary.entry(availability.to_string()).or_insert(0) += 1;
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use common::{Availability, Currency};
    use storage::InMemoryHistoryStore;

    fn engine() -> IndexEngine {
        IndexEngine::new(Arc::new(IndexConfig::default()), RateProvider::offline(1.08))
    }

    #[tokio::test]
    async fn test_no_usable_reports() {
        let reports = vec![PriceReport::new("AWS", 0.0), PriceReport::new("", 1.0)];
        let err = engine().compute(&reports).await.unwrap_err();
        assert_matches!(err, IndexError::NoUsableReports { dropped: 2 });

        let err = engine().compute(&[]).await.unwrap_err();
        assert_matches!(err, IndexError::NoUsableReports { dropped: 0 });
    }

    #[tokio::test]
    async fn test_invalid_report_is_dropped() {
        let reports = vec![
            PriceReport::new("RunPod", 2.0),
            PriceReport::new("Civo", f64::NAN),
        ];
        let result = engine().compute(&reports).await.unwrap();

        assert_eq!(result.long_tail_count, 1);
        assert!((result.long_tail_component - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_later_duplicate_replaces_earlier() {
        let reports = vec![
            PriceReport::new("AWS", 10.0),
            PriceReport::new("Amazon p4d", 4.10),
            PriceReport::new("RunPod", 1.0),
            PriceReport::new("RunPod", 2.0),
        ];
        let result = engine().compute(&reports).await.unwrap();

        assert_eq!(result.anchor_count, 1);
        assert_eq!(result.anchor_details[0].effective.original_price, 4.10);
        assert_eq!(result.anchor_details[0].provider_name, "Amazon p4d");
        assert_eq!(result.long_tail_count, 1);
        assert_eq!(result.long_tail_details[0].price, 2.0);
    }

    #[tokio::test]
    async fn test_result_records_rate_and_availability() {
        let reports = vec![
            PriceReport::new("Genesis Cloud", 1.0).with_currency(Currency::Eur),
            PriceReport::new("RunPod", 2.0).with_availability(Availability::High),
        ];
        let result = engine().compute(&reports).await.unwrap();

        let rate = result.exchange_rate.unwrap();
        assert_eq!(rate.rate, 1.08);
        assert_eq!(rate.origin, RateOrigin::Default);
        assert_eq!(result.provider_availability["RunPod"], Availability::High);
        assert_eq!(result.parameters.anchor_weights["AWS"], 0.42);

        let summary = availability_summary(&result);
        assert_eq!(summary["high"], 1);
        assert_eq!(summary["unknown"], 1);
    }

    #[tokio::test]
    async fn test_pipeline_commits_then_rejects() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let pipeline = IndexPipeline::from_config(
            Arc::new(IndexConfig::default()),
            RateProvider::offline(1.08),
            store.clone(),
        );

        let first = pipeline
            .run(&[PriceReport::new("RunPod", 2.0)], false)
            .await
            .unwrap();
        assert!(first.gate.is_committed());

        let jump = pipeline
            .run(&[PriceReport::new("RunPod", 4.0)], false)
            .await
            .unwrap();
        assert_matches!(jump.gate, GateOutcome::Rejected { .. });
        assert_eq!(store.len().await, 1);

        let forced = pipeline
            .run(&[PriceReport::new("RunPod", 4.0)], true)
            .await
            .unwrap();
        assert_eq!(forced.gate.label(), "overridden");

        let history = pipeline.history(10).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].override_applied);
        assert!(!history[0].validation_passed);
        assert_eq!(history[0].previous_price, Some(0.7));
    }

    #[tokio::test]
    async fn test_models_share_a_store_without_interfering() {
        let store = Arc::new(InMemoryHistoryStore::new());
        let a100 = IndexPipeline::from_config(
            Arc::new(IndexConfig::default()),
            RateProvider::offline(1.08),
            store.clone(),
        );

        let mut h100_config = IndexConfig::default();
        h100_config.index.gpu_model = "H100".to_string();
        let h100 = IndexPipeline::from_config(
            Arc::new(h100_config),
            RateProvider::offline(1.08),
            store.clone(),
        );

        let first = a100
            .run(&[PriceReport::new("RunPod", 2.0)], false)
            .await
            .unwrap();
        assert_eq!(first.result.final_index_price, 0.7);

        let other = h100
            .run(&[PriceReport::new("RunPod", 8.0)], false)
            .await
            .unwrap();
        assert_matches!(
            other.gate,
            GateOutcome::Committed(meta) if meta.previous_price.is_none()
        );

        assert_eq!(store.len().await, 2);
        assert_eq!(a100.history(10).await.unwrap()[0].index_price, 0.7);
        assert_eq!(h100.history(10).await.unwrap()[0].index_price, 2.8);
    }
}
