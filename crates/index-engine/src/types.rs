use chrono::{DateTime, Utc};
use common::Availability;
use config::{AvailabilityMultipliers, DiscountBlendConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Anchor price after applying its typical discount
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectivePrice {
    pub original_price: f64,
    pub discount_rate: f64,
    pub discounted_price: f64,
    pub blended_price: f64,
}

/// One anchor's contribution to an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorDetail {
    /// Canonical anchor id
    pub anchor: String,
    /// Name as reported
    pub provider_name: String,
    pub availability: Availability,
    pub effective: EffectivePrice,
    /// Relative weight inside the anchor cohort
    pub weight: f64,
    /// Weight applied to the effective price, after share scaling
    pub applied_weight: f64,
    pub contribution: f64,
}

/// One long-tail provider's contribution to an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTailDetail {
    pub provider_name: String,
    /// Price in the reference currency
    pub price: f64,
    pub availability: Availability,
    pub base_weight: f64,
    pub multiplier: f64,
    /// Weight within the cohort; cohort weights sum to 1
    pub normalized_weight: f64,
    /// Weight applied to the price, after share scaling
    pub applied_weight: f64,
    pub contribution: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_count: Option<u32>,
}

/// Parameters an index was computed with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexParameters {
    pub anchor_share: f64,
    pub long_tail_share: f64,
    pub redistribute_missing_anchor_share: bool,
    pub anchor_weights: BTreeMap<String, f64>,
    pub anchor_discounts: BTreeMap<String, f64>,
    pub discount_blend: DiscountBlendConfig,
    pub availability_multipliers: AvailabilityMultipliers,
}

/// Where the exchange rate of a run came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateOrigin {
    Primary,
    Fallback,
    /// Every source failed; the configured default was used
    Default,
}

impl std::fmt::Display for RateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateOrigin::Primary => write!(f, "primary"),
            RateOrigin::Fallback => write!(f, "fallback"),
            RateOrigin::Default => write!(f, "default"),
        }
    }
}

/// Exchange rate used to convert foreign-currency reports
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub rate: f64,
    pub origin: RateOrigin,
}

/// Output of one aggregation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexResult {
    pub timestamp: DateTime<Utc>,
    pub gpu_model: String,
    /// Rounded to 2 decimal places
    pub final_index_price: f64,
    pub anchor_component: f64,
    pub long_tail_component: f64,
    pub anchor_count: usize,
    pub long_tail_count: usize,
    pub anchor_details: Vec<AnchorDetail>,
    pub long_tail_details: Vec<LongTailDetail>,
    /// Availability of every provider that entered the index
    pub provider_availability: BTreeMap<String, Availability>,
    pub parameters: IndexParameters,
    /// Absent when no report needed conversion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_rate: Option<ExchangeRate>,
}
