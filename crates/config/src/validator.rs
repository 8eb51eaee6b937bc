use crate::*;
use std::collections::HashSet;
use thiserror::Error;

/// Tolerance used when checking that weights add up
const SUM_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("GPU model is required")]
    MissingGpuModel,

    #[error("{field} must be between 0 and 1, got {value}")]
    InvalidShare { field: String, value: f64 },

    #[error("Cohort shares must sum to 1, got {sum}")]
    SharesDoNotSumToOne { sum: f64 },

    #[error("No anchor providers defined")]
    NoAnchors,

    #[error("Anchor {id}: {message}")]
    InvalidAnchor { id: String, message: String },

    #[error("Duplicate anchor id '{0}'")]
    DuplicateAnchor(String),

    #[error("Discount blend weights must each be in [0, 1] and sum to 1, got {discounted} + {list}")]
    InvalidDiscountBlend { discounted: f64, list: f64 },

    #[error("Long-tail provider '{name}': base weight must be positive, got {value}")]
    InvalidBaseWeight { name: String, value: f64 },

    #[error("Default long-tail weight must be positive, got {0}")]
    InvalidDefaultWeight(f64),

    #[error("Availability multiplier '{availability}' must be positive, got {value}")]
    InvalidMultiplier { availability: String, value: f64 },

    #[error("Exchange rate: {message}")]
    InvalidExchangeRate { message: String },

    #[error("Gate max_change_percent must be positive, got {0}")]
    InvalidGateThreshold(f64),

    #[error("Storage: {message}")]
    InvalidStorage { message: String },

    #[error("Ingest: {message}")]
    InvalidIngest { message: String },

    #[error("Environment variable placeholder left unresolved in {field}")]
    UnresolvedEnvVar { field: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

pub fn validate_config(config: &IndexConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_index(&config.index, &mut report);
    validate_anchors(&config.anchors, &mut report);
    validate_blend(&config.discount_blend, &mut report);
    validate_long_tail(&config.long_tail, &mut report);
    validate_exchange_rate(&config.exchange_rate, &mut report);
    validate_gate(&config.gate, &mut report);
    validate_storage(&config.storage, &mut report);
    validate_ingest(&config.ingest, &mut report);

    report
}

fn is_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

fn validate_index(index: &IndexSettings, report: &mut ValidationReport) {
    if index.gpu_model.trim().is_empty() {
        report.add_error(ValidationError::MissingGpuModel);
    }

    for (field, value) in [
        ("index.anchor_share", index.anchor_share),
        ("index.long_tail_share", index.long_tail_share),
    ] {
        if !is_unit_interval(value) {
            report.add_error(ValidationError::InvalidShare {
                field: field.to_string(),
                value,
            });
        }
    }

    let sum = index.anchor_share + index.long_tail_share;
    if (sum - 1.0).abs() > SUM_TOLERANCE {
        report.add_error(ValidationError::SharesDoNotSumToOne { sum });
    }

    if index.redistribute_missing_anchor_share && index.long_tail_share == 0.0 {
        report.add_warning(
            "index.redistribute_missing_anchor_share",
            "Has no effect while long_tail_share is 0",
        );
    }
}

fn validate_anchors(anchors: &[AnchorConfig], report: &mut ValidationReport) {
    if anchors.is_empty() {
        report.add_error(ValidationError::NoAnchors);
        return;
    }

    let mut seen = HashSet::new();
    let mut weight_sum = 0.0;

    for anchor in anchors {
        if !seen.insert(anchor.id.as_str()) {
            report.add_error(ValidationError::DuplicateAnchor(anchor.id.clone()));
        }

        if anchor.id.trim().is_empty() {
            report.add_error(ValidationError::InvalidAnchor {
                id: "unknown".to_string(),
                message: "id is required".to_string(),
            });
        }

        if anchor.aliases.is_empty() || anchor.aliases.iter().any(|a| a.trim().is_empty()) {
            report.add_error(ValidationError::InvalidAnchor {
                id: anchor.id.clone(),
                message: "aliases must be a non-empty list of non-empty strings".to_string(),
            });
        }

        if anchor.aliases.iter().any(|a| a.to_lowercase() != *a) {
            report.add_warning(
                &format!("anchors.{}.aliases", anchor.id),
                "Aliases are matched against lowercased names; uppercase aliases never match",
            );
        }

        if !anchor.weight.is_finite() || anchor.weight <= 0.0 {
            report.add_error(ValidationError::InvalidAnchor {
                id: anchor.id.clone(),
                message: format!("weight must be positive, got {}", anchor.weight),
            });
        } else {
            weight_sum += anchor.weight;
        }

        if !anchor.discount.is_finite() || !(0.0..1.0).contains(&anchor.discount) {
            report.add_error(ValidationError::InvalidAnchor {
                id: anchor.id.clone(),
                message: format!("discount must be in [0, 1), got {}", anchor.discount),
            });
        }
    }

    if (weight_sum - 1.0).abs() > SUM_TOLERANCE {
        report.add_warning(
            "anchors.weight",
            &format!(
                "Anchor weights sum to {:.4}; the anchor cohort only totals its share when some anchors are missing",
                weight_sum
            ),
        );
    }
}

fn validate_blend(blend: &DiscountBlendConfig, report: &mut ValidationReport) {
    let valid = is_unit_interval(blend.discounted_weight)
        && is_unit_interval(blend.list_weight)
        && ((blend.discounted_weight + blend.list_weight) - 1.0).abs() <= SUM_TOLERANCE;

    if !valid {
        report.add_error(ValidationError::InvalidDiscountBlend {
            discounted: blend.discounted_weight,
            list: blend.list_weight,
        });
    }
}

fn validate_long_tail(long_tail: &LongTailConfig, report: &mut ValidationReport) {
    for (name, &value) in &long_tail.base_weights {
        if !value.is_finite() || value <= 0.0 {
            report.add_error(ValidationError::InvalidBaseWeight {
                name: name.clone(),
                value,
            });
        }
    }

    if !long_tail.default_weight.is_finite() || long_tail.default_weight <= 0.0 {
        report.add_error(ValidationError::InvalidDefaultWeight(long_tail.default_weight));
    }

    for availability in common::Availability::ALL {
        let value = long_tail.availability_multipliers.get(availability);
        if !value.is_finite() || value <= 0.0 {
            report.add_error(ValidationError::InvalidMultiplier {
                availability: availability.to_string(),
                value,
            });
        }
    }
}

fn validate_exchange_rate(rate: &ExchangeRateConfig, report: &mut ValidationReport) {
    for (field, value) in [
        ("exchange_rate.primary_url", &rate.primary_url),
        ("exchange_rate.fallback_url", &rate.fallback_url),
    ] {
        let Some(value) = value else { continue };

        if has_unresolved_env_vars(value) {
            report.add_error(ValidationError::UnresolvedEnvVar {
                field: field.to_string(),
            });
        } else if let Err(e) = url::Url::parse(value) {
            report.add_error(ValidationError::InvalidExchangeRate {
                message: format!("{} is not a valid URL ({}): {}", field, e, value),
            });
        }
    }

    if rate.primary_url.is_none() && rate.fallback_url.is_none() {
        report.add_warning(
            "exchange_rate",
            "No live rate source configured; the default rate is always used",
        );
    }

    if rate.timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidExchangeRate {
            message: "timeout_seconds must be a positive integer".to_string(),
        });
    }

    if !rate.default_rate.is_finite() || rate.default_rate <= 0.0 {
        report.add_error(ValidationError::InvalidExchangeRate {
            message: format!("default_rate must be positive, got {}", rate.default_rate),
        });
    }

    if rate.quote_currency.trim().is_empty() {
        report.add_error(ValidationError::InvalidExchangeRate {
            message: "quote_currency is required".to_string(),
        });
    }
}

fn validate_gate(gate: &GateConfig, report: &mut ValidationReport) {
    if !gate.max_change_percent.is_finite() || gate.max_change_percent <= 0.0 {
        report.add_error(ValidationError::InvalidGateThreshold(gate.max_change_percent));
    }
}

fn validate_storage(storage: &StorageConfig, report: &mut ValidationReport) {
    match storage.backend {
        StorageBackend::Memory => report.add_warning(
            "storage.backend",
            "Memory backend keeps no history between runs; every run is a first observation",
        ),
        StorageBackend::File => {
            if storage.path.trim().is_empty() {
                report.add_error(ValidationError::InvalidStorage {
                    message: "path is required for the file backend".to_string(),
                });
            }
        }
        StorageBackend::Postgres => match &storage.database_url {
            None => report.add_error(ValidationError::InvalidStorage {
                message: "database_url is required for the postgres backend".to_string(),
            }),
            Some(url) if has_unresolved_env_vars(url) => {
                report.add_error(ValidationError::UnresolvedEnvVar {
                    field: "storage.database_url".to_string(),
                })
            }
            Some(_) => {}
        },
    }

    let table_ok = !storage.table.is_empty()
        && storage
            .table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !table_ok {
        report.add_error(ValidationError::InvalidStorage {
            message: format!("table must be a plain identifier, got '{}'", storage.table),
        });
    }
}

fn validate_ingest(ingest: &IngestConfig, report: &mut ValidationReport) {
    if ingest.file_suffix.trim().is_empty() {
        report.add_error(ValidationError::InvalidIngest {
            message: "file_suffix is required".to_string(),
        });
    }

    if !ingest.file_suffix.ends_with(".json") {
        report.add_warning("ingest.file_suffix", "Collector outputs are expected to be JSON files");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&generate_default_config());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_shares_must_sum_to_one() {
        let mut config = generate_default_config();
        config.index.anchor_share = 0.7;

        let report = validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::SharesDoNotSumToOne { .. })));
    }

    #[test]
    fn test_invalid_anchor_values() {
        let mut config = generate_default_config();
        config.anchors[0].discount = 1.0;
        config.anchors[1].weight = 0.0;
        config.anchors[2].aliases.clear();

        let report = validate_config(&config);
        let anchor_errors = report
            .errors
            .iter()
            .filter(|e| matches!(e, ValidationError::InvalidAnchor { .. }))
            .count();
        assert_eq!(anchor_errors, 3);
    }

    #[test]
    fn test_duplicate_anchor() {
        let mut config = generate_default_config();
        let dup = config.anchors[0].clone();
        config.anchors.push(dup);

        let report = validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::DuplicateAnchor(id) if id == "AWS")));
    }

    #[test]
    fn test_anchor_weight_sum_is_warning() {
        let mut config = generate_default_config();
        config.anchors[0].weight = 0.5;

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.field == "anchors.weight"));
    }

    #[test]
    fn test_bad_blend_and_multiplier() {
        let mut config = generate_default_config();
        config.discount_blend.list_weight = 0.5;
        config.long_tail.availability_multipliers.unavailable = 0.0;

        let report = validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidDiscountBlend { .. })));
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidMultiplier { .. })));
    }

    #[test]
    fn test_exchange_rate_checks() {
        let mut config = generate_default_config();
        config.exchange_rate.primary_url = Some("not a url".to_string());
        config.exchange_rate.fallback_url = Some("${RATE_URL}".to_string());
        config.exchange_rate.default_rate = 0.0;

        let report = validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::UnresolvedEnvVar { .. })));
        let rate_errors = report
            .errors
            .iter()
            .filter(|e| matches!(e, ValidationError::InvalidExchangeRate { .. }))
            .count();
        assert_eq!(rate_errors, 2);
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let mut config = generate_default_config();
        config.storage.backend = StorageBackend::Postgres;

        let report = validate_config(&config);
        assert!(!report.is_valid());

        config.storage.database_url = Some("postgres://localhost/index".to_string());
        config.storage.table = "prices; drop".to_string();
        let report = validate_config(&config);
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_gate_threshold() {
        let mut config = generate_default_config();
        config.gate.max_change_percent = 0.0;

        let report = validate_config(&config);
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidGateThreshold(_))));
    }
}
