//! Currency normalization
//!
//! Foreign-currency reports are converted with one rate per run. Rate
//! sources are tried in order (primary, then fallback) and the
//! configured default is used when both fail, so conversion never fails
//! a run.

use async_trait::async_trait;
use common::Currency;
use config::ExchangeRateConfig;
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{IndexError, Result};
use crate::types::{ExchangeRate, RateOrigin};

/// Source of the foreign-to-reference exchange rate
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Fetch the current rate
    async fn fetch_rate(&self) -> Result<f64>;
}

// ==================== HTTP Implementation ====================

/// Rate source reading `{"rates": {"<quote>": <rate>}}` over HTTP
pub struct HttpRateSource {
    client: Client,
    url: String,
    quote_currency: String,
}

impl HttpRateSource {
    /// Create a source; every request is bounded by `timeout`
    pub fn new(url: &str, quote_currency: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::InvalidConfig(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            quote_currency: quote_currency.to_string(),
        })
    }
}

#[async_trait]
impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch_rate(&self) -> Result<f64> {
        let failed = |message: String| IndexError::RateSource {
            source_name: self.url.clone(),
            message,
        };

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(failed(format!("HTTP {}", response.status())));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| failed(e.to_string()))?;

        body.get("rates")
            .and_then(|rates| rates.get(&self.quote_currency))
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| failed(format!("no rates.{} in response", self.quote_currency)))
    }
}

// ==================== Fixed Implementation ====================

/// Rate source returning a fixed rate, or always failing
///
/// Counts fetches so callers can check caching.
pub struct FixedRateSource {
    rate: Option<f64>,
    fetches: AtomicUsize,
}

impl FixedRateSource {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: Some(rate),
            fetches: AtomicUsize::new(0),
        }
    }

    /// A source that is always unreachable
    pub fn failing() -> Self {
        Self {
            rate: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for FixedRateSource {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch_rate(&self) -> Result<f64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.rate.ok_or_else(|| IndexError::RateSource {
            source_name: "fixed".to_string(),
            message: "unreachable".to_string(),
        })
    }
}

// ==================== Provider ====================

/// Ordered rate sources plus the default rate
#[derive(Clone)]
pub struct RateProvider {
    primary: Option<Arc<dyn RateSource>>,
    fallback: Option<Arc<dyn RateSource>>,
    default_rate: f64,
}

impl RateProvider {
    pub fn new(
        primary: Option<Arc<dyn RateSource>>,
        fallback: Option<Arc<dyn RateSource>>,
        default_rate: f64,
    ) -> Self {
        Self {
            primary,
            fallback,
            default_rate,
        }
    }

    /// Provider with no live sources; always yields the default rate
    pub fn offline(default_rate: f64) -> Self {
        Self::new(None, None, default_rate)
    }

    /// Build HTTP sources from configuration
    pub fn from_config(config: &ExchangeRateConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_seconds);
        let http = |url: &Option<String>| -> Result<Option<Arc<dyn RateSource>>> {
            match url {
                Some(url) => {
                    let source = HttpRateSource::new(url, &config.quote_currency, timeout)?;
                    Ok(Some(Arc::new(source) as Arc<dyn RateSource>))
                }
                None => Ok(None),
            }
        };

        Ok(Self::new(
            http(&config.primary_url)?,
            http(&config.fallback_url)?,
            config.default_rate,
        ))
    }

    /// Resolve a rate: primary, then fallback, then the default
    pub async fn resolve(&self) -> ExchangeRate {
        let sources = [
            (self.primary.as_ref(), RateOrigin::Primary),
            (self.fallback.as_ref(), RateOrigin::Fallback),
        ];

        for (source, origin) in sources {
            let Some(source) = source else { continue };

            match source.fetch_rate().await {
                Ok(rate) if rate.is_finite() && rate > 0.0 => {
                    info!(source = source.name(), rate, %origin, "Exchange rate fetched");
                    return ExchangeRate { rate, origin };
                }
                Ok(rate) => {
                    warn!(source = source.name(), rate, "Rate source returned an invalid rate");
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Rate source failed");
                }
            }
        }

        warn!(rate = self.default_rate, "All rate sources failed, using default rate");
        ExchangeRate {
            rate: self.default_rate,
            origin: RateOrigin::Default,
        }
    }
}

// ==================== Normalizer ====================

/// Per-run converter to the reference currency
///
/// The rate is fetched on the first foreign-currency conversion and
/// reused for the rest of the run.
pub struct CurrencyNormalizer<'a> {
    provider: &'a RateProvider,
    rate: OnceCell<ExchangeRate>,
}

impl<'a> CurrencyNormalizer<'a> {
    pub fn new(provider: &'a RateProvider) -> Self {
        Self {
            provider,
            rate: OnceCell::new(),
        }
    }

    /// Convert a price to the reference currency
    pub async fn to_reference(&self, price: f64, currency: Currency) -> f64 {
        if currency.is_reference() {
            return price;
        }

        let rate = self.rate.get_or_init(|| self.provider.resolve()).await;
        let converted = price * rate.rate;
        debug!(price, %currency, rate = rate.rate, converted, "Converted price");
        converted
    }

    /// Rate used so far in this run, if any conversion happened
    pub fn rate(&self) -> Option<ExchangeRate> {
        self.rate.get().copied()
    }
}
