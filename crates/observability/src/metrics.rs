//! Prometheus metrics for index runs
//!
//! Metrics go through the `metrics` facade; without an installed
//! recorder every call is a no-op, so the CLI only pays for them when
//! `--metrics-port` is given.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener exposing `/metrics` on the given port.
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Metric set for one GPU model's index
///
/// # Metrics
///
/// * `index_runs_total` - Completed aggregation runs
/// * `index_run_failures_total` - Runs that produced no result
/// * `index_reports_dropped_total` - Reports discarded before aggregation
/// * `index_rate_fallback_total` - Runs that used the default exchange rate
/// * `index_gate_outcomes_total` - Gate decisions, labelled by outcome
/// * `index_last_price` - Last computed index price
/// * `index_run_duration_seconds` - Aggregation duration
#[derive(Clone)]
pub struct IndexMetrics {
    runs_total: Counter,
    run_failures: Counter,
    reports_dropped: Counter,
    rate_fallbacks: Counter,
    last_price: Gauge,
    run_duration: Histogram,
    gpu_model: String,
}

impl IndexMetrics {
    pub fn new(gpu_model: &str) -> Self {
        let model = gpu_model.to_string();

        Self {
            runs_total: counter!("index_runs_total", "gpu_model" => model.clone()),
            run_failures: counter!("index_run_failures_total", "gpu_model" => model.clone()),
            reports_dropped: counter!("index_reports_dropped_total", "gpu_model" => model.clone()),
            rate_fallbacks: counter!("index_rate_fallback_total", "gpu_model" => model.clone()),
            last_price: gauge!("index_last_price", "gpu_model" => model.clone()),
            run_duration: histogram!("index_run_duration_seconds", "gpu_model" => model.clone()),
            gpu_model: model,
        }
    }

    /// Record a completed aggregation run
    pub fn record_run(&self, duration: Duration, index_price: f64) {
        self.runs_total.increment(1);
        self.run_duration.record(duration.as_secs_f64());
        self.last_price.set(index_price);
    }

    pub fn record_failure(&self) {
        self.run_failures.increment(1);
    }

    pub fn record_dropped_reports(&self, count: usize) {
        self.reports_dropped.increment(count as u64);
    }

    pub fn record_rate_fallback(&self) {
        self.rate_fallbacks.increment(1);
    }

    /// Record a change-gate decision ("committed", "overridden", "rejected")
    pub fn record_gate_outcome(&self, outcome: &'static str) {
        counter!(
            "index_gate_outcomes_total",
            "gpu_model" => self.gpu_model.clone(),
            "outcome" => outcome
        )
        .increment(1);
    }

    pub fn gpu_model(&self) -> &str {
        &self.gpu_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_metrics_without_recorder() {
        // No recorder installed: every call must be a no-op
        let metrics = IndexMetrics::new("A100");
        metrics.record_run(Duration::from_millis(5), 1.76);
        metrics.record_dropped_reports(2);
        metrics.record_rate_fallback();
        metrics.record_gate_outcome("committed");
        metrics.record_failure();

        assert_eq!(metrics.gpu_model(), "A100");
    }
}
