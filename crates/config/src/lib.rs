use common::Availability;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root of the index configuration file
///
/// Every table is built once at startup and handed to the engine
/// read-only, so several engines (one per GPU model) never share
/// mutable state.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexConfig {
    pub index: IndexSettings,
    /// Anchor providers in matching order; the first alias hit wins
    #[serde(default = "default_anchors")]
    pub anchors: Vec<AnchorConfig>,
    #[serde(default)]
    pub discount_blend: DiscountBlendConfig,
    #[serde(default)]
    pub long_tail: LongTailConfig,
    #[serde(default)]
    pub exchange_rate: ExchangeRateConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Default for IndexConfig {
    fn default() -> Self {
        parser::generate_default_config()
    }
}

impl IndexConfig {
    /// Look up an anchor by its canonical id
    pub fn anchor(&self, id: &str) -> Option<&AnchorConfig> {
        self.anchors.iter().find(|a| a.id == id)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IndexSettings {
    /// GPU model the index is computed for (e.g. "A100")
    pub gpu_model: String,
    /// Aggregate share of the anchor cohort
    #[serde(default = "default_anchor_share")]
    pub anchor_share: f64,
    /// Aggregate share of the long-tail cohort
    #[serde(default = "default_long_tail_share")]
    pub long_tail_share: f64,
    /// Scale the long-tail cohort to 100% when no anchor reported
    #[serde(default)]
    pub redistribute_missing_anchor_share: bool,
}

/// One anchor provider
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnchorConfig {
    /// Canonical id (e.g. "AWS")
    pub id: String,
    /// Lowercase substrings that identify this anchor
    pub aliases: Vec<String>,
    /// Relative weight inside the anchor cohort
    pub weight: f64,
    /// Typical effective-vs-list discount
    #[serde(default = "default_anchor_discount")]
    pub discount: f64,
}

impl AnchorConfig {
    pub fn new(id: &str, aliases: &[&str], weight: f64, discount: f64) -> Self {
        Self {
            id: id.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            weight,
            discount,
        }
    }
}

/// Blend of discounted and list price for anchors
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct DiscountBlendConfig {
    #[serde(default = "default_discounted_weight")]
    pub discounted_weight: f64,
    #[serde(default = "default_list_weight")]
    pub list_weight: f64,
}

impl Default for DiscountBlendConfig {
    fn default() -> Self {
        Self {
            discounted_weight: default_discounted_weight(),
            list_weight: default_list_weight(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LongTailConfig {
    /// Base weights keyed by the provider name exactly as reported
    #[serde(default = "default_base_weights")]
    pub base_weights: BTreeMap<String, f64>,
    /// Base weight for providers absent from `base_weights`
    #[serde(default = "default_long_tail_weight")]
    pub default_weight: f64,
    #[serde(default)]
    pub availability_multipliers: AvailabilityMultipliers,
}

impl Default for LongTailConfig {
    fn default() -> Self {
        Self {
            base_weights: default_base_weights(),
            default_weight: default_long_tail_weight(),
            availability_multipliers: AvailabilityMultipliers::default(),
        }
    }
}

impl LongTailConfig {
    /// Base weight for a provider, falling back to the default weight
    pub fn base_weight(&self, provider: &str) -> f64 {
        self.base_weights
            .get(provider)
            .copied()
            .unwrap_or(self.default_weight)
    }
}

/// Weight multipliers keyed by reported availability
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct AvailabilityMultipliers {
    #[serde(default = "default_high_multiplier")]
    pub high: f64,
    #[serde(default = "default_unit_multiplier")]
    pub medium: f64,
    #[serde(default = "default_low_multiplier")]
    pub low: f64,
    #[serde(default = "default_unavailable_multiplier")]
    pub unavailable: f64,
    #[serde(default = "default_unit_multiplier")]
    pub unknown: f64,
}

impl Default for AvailabilityMultipliers {
    fn default() -> Self {
        Self {
            high: default_high_multiplier(),
            medium: default_unit_multiplier(),
            low: default_low_multiplier(),
            unavailable: default_unavailable_multiplier(),
            unknown: default_unit_multiplier(),
        }
    }
}

impl AvailabilityMultipliers {
    pub fn get(&self, availability: Availability) -> f64 {
        match availability {
            Availability::High => self.high,
            Availability::Medium => self.medium,
            Availability::Low => self.low,
            Availability::Unavailable => self.unavailable,
            Availability::Unknown => self.unknown,
        }
    }
}

/// Live exchange-rate sources for the foreign currency
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExchangeRateConfig {
    #[serde(default = "default_primary_rate_url")]
    pub primary_url: Option<String>,
    #[serde(default = "default_fallback_rate_url")]
    pub fallback_url: Option<String>,
    #[serde(default = "default_rate_timeout")]
    pub timeout_seconds: u64,
    /// Conservative rate used when every source fails
    #[serde(default = "default_exchange_rate")]
    pub default_rate: f64,
    /// Code looked up in the source's `rates` map
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
}

impl Default for ExchangeRateConfig {
    fn default() -> Self {
        Self {
            primary_url: default_primary_rate_url(),
            fallback_url: default_fallback_rate_url(),
            timeout_seconds: default_rate_timeout(),
            default_rate: default_exchange_rate(),
            quote_currency: default_quote_currency(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct GateConfig {
    /// Largest accepted move against the last committed price, in percent
    #[serde(default = "default_max_change_percent")]
    pub max_change_percent: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_change_percent: default_max_change_percent(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Postgres,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// JSON-lines history file for the `file` backend
    #[serde(default = "default_history_path")]
    pub path: String,
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default = "default_history_table")]
    pub table: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_history_path(),
            database_url: None,
            table: default_history_table(),
        }
    }
}

/// Where collector outputs are read from and the report is written to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestConfig {
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_file_suffix")]
    pub file_suffix: String,
    #[serde(default = "default_report_output")]
    pub report_output: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            file_suffix: default_file_suffix(),
            report_output: default_report_output(),
        }
    }
}
