//! Collector document extraction
//!
//! Collectors write one JSON document per provider in one of three
//! shapes: an enhanced document with a price `distribution`, a nested
//! `providers.*.variants.*` document, or a flat `prices` map of
//! display strings. This module turns any of them into one
//! [`PriceReport`].

use common::{Availability, Currency, PriceReport};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Why a document produced no report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The collector flagged its own fetch as failed
    FetchFailed,
    /// Neither `prices`, `providers` nor `distribution` present
    NoPriceData,
    /// Price data present but no number could be extracted
    NoParseablePrice,
    /// The file is not valid JSON
    Malformed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::FetchFailed => write!(f, "collector reported a failed fetch"),
            SkipReason::NoPriceData => write!(f, "no price data"),
            SkipReason::NoParseablePrice => write!(f, "no parseable price"),
            SkipReason::Malformed(message) => write!(f, "malformed JSON: {}", message),
        }
    }
}

const USD_PATTERN: &str = r"\$?\s*(\d+(?:\.\d+)?)";
const EUR_PATTERN: &str = r"€?\s*(\d+(?:\.\d+)?)";

fn compiled(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn first_number(text: &str, pattern: &Regex) -> Option<f64> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// First dollar amount in a display string such as "$1.64/hr"
pub fn parse_usd(text: &str) -> Option<f64> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, USD_PATTERN).and_then(|re| first_number(text, re))
}

/// First euro amount in a display string such as "€1.45/hr"
pub fn parse_eur(text: &str) -> Option<f64> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    compiled(&RE, EUR_PATTERN).and_then(|re| first_number(text, re))
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

/// Convert one collector document into a report
///
/// `fallback_name` is used when the document carries no `provider`.
pub fn extract_report(doc: &Value, fallback_name: &str) -> Result<PriceReport, SkipReason> {
    if doc.get("fetch_status").and_then(Value::as_str) == Some("failed") {
        return Err(SkipReason::FetchFailed);
    }

    if !is_present(doc.get("prices")) && !is_present(doc.get("providers")) {
        return Err(SkipReason::NoPriceData);
    }

    let provider = doc
        .get("provider")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(fallback_name);

    let mut report = extract_distribution(doc, provider)
        .or_else(|| extract_nested(doc, provider))
        .or_else(|| extract_flat(doc, provider))
        .ok_or(SkipReason::NoParseablePrice)?;

    if let Some(availability) = doc.get("availability").and_then(Value::as_str) {
        report.availability = Availability::parse(availability);
    }

    if let Some(count) = doc.get("gpu_count").and_then(Value::as_u64) {
        report.gpu_count = u32::try_from(count).ok();
    }

    Ok(report)
}

/// Marketplace documents: the distribution median is the price, in USD
fn extract_distribution(doc: &Value, provider: &str) -> Option<PriceReport> {
    let dist = doc.get("distribution")?;
    let median = dist.get("median").and_then(Value::as_f64)?;
    let min = dist.get("min").and_then(Value::as_f64).unwrap_or(median);
    let max = dist.get("max").and_then(Value::as_f64).unwrap_or(median);

    Some(PriceReport::new(provider, median).with_distribution(min, median, max))
}

/// Anchor documents: `providers.<name>.variants.<variant>.price_per_hour`
fn extract_nested(doc: &Value, provider: &str) -> Option<PriceReport> {
    let providers = doc.get("providers").and_then(Value::as_object)?;

    providers
        .values()
        .filter_map(|p| p.get("variants").and_then(Value::as_object))
        .flat_map(Map::values)
        .find_map(|variant| {
            let price = variant.get("price_per_hour").and_then(Value::as_f64)?;
            let currency = variant
                .get("currency")
                .and_then(Value::as_str)
                .and_then(|c| c.parse::<Currency>().ok())
                .unwrap_or_default();
            Some(PriceReport::new(provider, price).with_currency(currency))
        })
}

/// Long-tail documents: `prices` maps variant names to display strings
///
/// A median or mean variant wins over list variants; otherwise the first
/// parseable variant in document order is used.
fn extract_flat(doc: &Value, provider: &str) -> Option<PriceReport> {
    let prices = doc.get("prices").and_then(Value::as_object)?;

    let entries: Vec<(&String, String)> = prices
        .iter()
        .filter(|(variant, _)| variant.as_str() != "Error")
        .filter_map(|(variant, value)| as_text(value).map(|text| (variant, text)))
        .collect();

    let summary = entries
        .iter()
        .filter(|(variant, _)| variant.contains("Median") || variant.contains("Mean"))
        .find_map(|(_, text)| parse_usd(text))
        .map(|price| PriceReport::new(provider, price));

    summary.or_else(|| {
        entries.iter().find_map(|(_, text)| {
            if text.contains('€') {
                parse_eur(text)
                    .map(|price| PriceReport::new(provider, price).with_currency(Currency::Eur))
            } else {
                parse_usd(text).map(|price| PriceReport::new(provider, price))
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_distribution_median_wins() {
        let doc = json!({
            "provider": "Vast.ai",
            "prices": { "A100 Min": "$1.00/hr", "A100 Median": "$1.80/hr" },
            "distribution": { "min": 1.0, "median": 1.8, "max": 3.5 },
            "availability": "high",
            "gpu_count": 42
        });

        let report = extract_report(&doc, "vastai").unwrap();
        assert_eq!(report.provider_name, "Vast.ai");
        assert_eq!(report.canonical_price(), 1.8);
        assert_eq!(report.currency, Currency::Usd);
        assert_eq!(report.availability, Availability::High);
        assert_eq!(report.gpu_count, Some(42));
    }

    #[test]
    fn test_nested_variant_price() {
        let doc = json!({
            "provider": "AWS",
            "fetch_status": "success",
            "providers": {
                "AWS": {
                    "variants": {
                        "P4d.24xlarge (AWS)": {
                            "price_per_hour": 4.10,
                            "currency": "USD",
                            "availability": "on-demand"
                        }
                    }
                }
            }
        });

        let report = extract_report(&doc, "aws").unwrap();
        assert_eq!(report.raw_price, 4.10);
        assert_eq!(report.availability, Availability::Unknown);
    }

    #[test]
    fn test_nested_null_price_is_not_parseable() {
        let doc = json!({
            "provider": "Azure",
            "providers": { "Azure": { "variants": { "ND96asr": { "price_per_hour": null } } } }
        });

        assert_eq!(extract_report(&doc, "azure"), Err(SkipReason::NoParseablePrice));
    }

    #[test]
    fn test_flat_prices_prefer_median() {
        let doc = json!({
            "provider": "RunPod",
            "prices": {
                "A100 PCIe": "$1.64/hr",
                "A100 SXM (Median)": "$1.89/hr"
            }
        });

        let report = extract_report(&doc, "runpod").unwrap();
        assert_eq!(report.raw_price, 1.89);
    }

    #[test]
    fn test_flat_euro_price() {
        let doc = json!({
            "provider": "Genesis Cloud",
            "prices": { "Error": "timeout", "A100 80GB": "€ 1.45/hr" }
        });

        let report = extract_report(&doc, "genesis").unwrap();
        assert_eq!(report.currency, Currency::Eur);
        assert_eq!(report.raw_price, 1.45);
    }

    #[test]
    fn test_failed_and_empty_documents_are_skipped() {
        let failed = json!({
            "provider": "Civo",
            "fetch_status": "failed",
            "prices": { "A100": "$1.79" }
        });
        assert_eq!(extract_report(&failed, "civo"), Err(SkipReason::FetchFailed));

        let empty = json!({ "provider": "Civo", "prices": {} });
        assert_eq!(extract_report(&empty, "civo"), Err(SkipReason::NoPriceData));

        let only_errors = json!({ "provider": "Civo", "prices": { "Error": "blocked" } });
        assert_eq!(extract_report(&only_errors, "civo"), Err(SkipReason::NoParseablePrice));
    }

    #[test]
    fn test_distribution_without_prices_is_skipped() {
        let doc = json!({
            "provider": "Vast.ai",
            "distribution": { "min": 1.0, "median": 1.8, "max": 3.5 }
        });
        assert_eq!(extract_report(&doc, "vastai"), Err(SkipReason::NoPriceData));
    }

    #[test]
    fn test_fallback_name() {
        let doc = json!({ "prices": { "A100": "$1.29/hr" } });
        let report = extract_report(&doc, "hostkey").unwrap();
        assert_eq!(report.provider_name, "hostkey");
    }

    #[test]
    fn test_parse_price_patterns() {
        assert_eq!(parse_usd("$2.49/hr"), Some(2.49));
        assert_eq!(parse_usd("from $ 3/hr"), Some(3.0));
        assert_eq!(parse_eur("€1.10"), Some(1.10));
        assert_eq!(parse_usd("n/a"), None);
    }
}
