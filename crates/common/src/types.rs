//! Common types used across the GPU index
//!
//! This module provides the per-provider observation types shared by the
//! ingestion adapter, the aggregation engine and the history stores.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Currency a provider quoted its price in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Reference currency of the index
    #[default]
    Usd,
    /// Foreign currency, converted with the run's cached rate
    Eur,
}

impl Currency {
    /// ISO code of the currency
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Returns true for the index's reference currency
    pub fn is_reference(&self) -> bool {
        matches!(self, Currency::Usd)
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" | "$" => Ok(Currency::Usd),
            "EUR" | "€" => Ok(Currency::Eur),
            other => Err(Error::invalid_input(format!("unsupported currency: {}", other))),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse supply signal reported alongside a price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    High,
    Medium,
    Low,
    Unavailable,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Availability {
    /// All availability levels, in configuration order
    pub const ALL: [Availability; 5] = [
        Availability::High,
        Availability::Medium,
        Availability::Low,
        Availability::Unavailable,
        Availability::Unknown,
    ];

    /// Parse leniently; anything unrecognised (e.g. "on-demand") is `Unknown`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Availability::High,
            "medium" => Availability::Medium,
            "low" => Availability::Low,
            "unavailable" => Availability::Unavailable,
            _ => Availability::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::High => "high",
            Availability::Medium => "medium",
            Availability::Low => "low",
            Availability::Unavailable => "unavailable",
            Availability::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Spread of concurrent offers reported by a marketplace provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceDistribution {
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

/// One provider's price observation for a run
///
/// Prices are per accelerator-hour. When a distribution is present its
/// median is the canonical price and `raw_price` is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceReport {
    pub provider_name: String,
    pub raw_price: f64,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub availability: Availability,
    #[serde(default)]
    pub distribution: Option<PriceDistribution>,
    #[serde(default)]
    pub gpu_count: Option<u32>,
}

impl PriceReport {
    /// Create a USD report with unknown availability
    pub fn new(provider_name: impl Into<String>, raw_price: f64) -> Self {
        Self {
            provider_name: provider_name.into(),
            raw_price,
            currency: Currency::Usd,
            availability: Availability::Unknown,
            distribution: None,
            gpu_count: None,
        }
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_availability(mut self, availability: Availability) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_distribution(mut self, min: f64, median: f64, max: f64) -> Self {
        self.distribution = Some(PriceDistribution { min, median, max });
        self
    }

    pub fn with_gpu_count(mut self, gpu_count: u32) -> Self {
        self.gpu_count = Some(gpu_count);
        self
    }

    /// Price the pipeline aggregates, in the report's own currency
    pub fn canonical_price(&self) -> f64 {
        match &self.distribution {
            Some(dist) => dist.median,
            None => self.raw_price,
        }
    }

    /// Check the report can enter the pipeline
    pub fn validate(&self) -> crate::Result<()> {
        if self.provider_name.trim().is_empty() {
            return Err(Error::invalid_input("provider name is empty"));
        }

        let price = self.canonical_price();
        if !price.is_finite() || price <= 0.0 {
            return Err(Error::invalid_input(format!(
                "{}: price must be positive, got {}",
                self.provider_name, price
            )));
        }

        Ok(())
    }
}

/// Cohort a classified provider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    /// One of the fixed set of large providers
    Anchor,
    /// Everything else
    LongTail,
}

impl std::fmt::Display for Cohort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cohort::Anchor => write!(f, "anchor"),
            Cohort::LongTail => write!(f, "long_tail"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_is_canonical_price() {
        let report = PriceReport::new("Vast.ai", 2.5).with_distribution(1.0, 1.8, 3.5);
        assert_eq!(report.canonical_price(), 1.8);

        let report = PriceReport::new("Civo", 2.5);
        assert_eq!(report.canonical_price(), 2.5);
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        assert!(PriceReport::new("Civo", 0.0).validate().is_err());
        assert!(PriceReport::new("Civo", -1.0).validate().is_err());
        assert!(PriceReport::new("Civo", f64::NAN).validate().is_err());
        assert!(PriceReport::new("  ", 1.0).validate().is_err());
        assert!(PriceReport::new("Civo", 1.0).validate().is_ok());

        // A bad median invalidates the report even when raw_price is fine
        let report = PriceReport::new("Vast.ai", 2.5).with_distribution(0.0, 0.0, 1.0);
        assert!(report.validate().is_err());
    }

    #[test]
    fn test_availability_parse() {
        assert_eq!(Availability::parse("HIGH"), Availability::High);
        assert_eq!(Availability::parse(" low "), Availability::Low);
        assert_eq!(Availability::parse("unavailable"), Availability::Unavailable);
        assert_eq!(Availability::parse("on-demand"), Availability::Unknown);
    }

    #[test]
    fn test_report_deserialize_defaults() {
        let json = r#"{"provider_name": "RunPod", "raw_price": 1.64, "availability": "on-demand"}"#;
        let report: PriceReport = serde_json::from_str(json).unwrap();

        assert_eq!(report.currency, Currency::Usd);
        assert_eq!(report.availability, Availability::Unknown);
        assert!(report.distribution.is_none());
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("usd".parse::<Currency>().unwrap(), Currency::Usd);
        assert_eq!("EUR".parse::<Currency>().unwrap(), Currency::Eur);
        assert_eq!("€".parse::<Currency>().unwrap(), Currency::Eur);
        assert!("GBP".parse::<Currency>().is_err());
    }
}
