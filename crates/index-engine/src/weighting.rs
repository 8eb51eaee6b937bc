//! Dynamic long-tail weighting
//!
//! Each provider's base weight is scaled by its availability multiplier
//! and the result is normalized over the cohort present in the run.
//! Unavailable providers keep a reduced weight.

use common::Availability;
use config::LongTailConfig;

/// Weight of one long-tail provider within its cohort
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderWeight {
    pub provider_name: String,
    pub base_weight: f64,
    pub multiplier: f64,
    /// Sums to 1 across the cohort
    pub normalized_weight: f64,
}

/// Normalized weights for the long-tail providers of one run
///
/// Returns weights in input order; an empty cohort yields no weights.
pub fn long_tail_weights(
    providers: &[(&str, Availability)],
    config: &LongTailConfig,
) -> Vec<ProviderWeight> {
    let raw: Vec<(f64, f64)> = providers
        .iter()
        .map(|(name, availability)| {
            (
                config.base_weight(name),
                config.availability_multipliers.get(*availability),
            )
        })
        .collect();

    let total: f64 = raw.iter().map(|(base, multiplier)| base * multiplier).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    providers
        .iter()
        .zip(raw)
        .map(|((name, _), (base_weight, multiplier))| ProviderWeight {
            provider_name: name.to_string(),
            base_weight,
            multiplier,
            normalized_weight: base_weight * multiplier / total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(weights: &[ProviderWeight]) -> f64 {
        weights.iter().map(|w| w.normalized_weight).sum()
    }

    #[test]
    fn test_weights_sum_to_one() {
        let config = LongTailConfig::default();
        let weights = long_tail_weights(
            &[
                ("RunPod", Availability::High),
                ("Vast.ai", Availability::Medium),
                ("Hostkey", Availability::Low),
                ("Someone New", Availability::Unknown),
            ],
            &config,
        );

        assert_eq!(weights.len(), 4);
        assert!((sum(&weights) - 1.0).abs() < 1e-9);
        assert_eq!(weights[3].base_weight, 0.05);
        assert_eq!(weights[0].multiplier, 1.2);
    }

    #[test]
    fn test_all_unavailable_still_sum_to_one() {
        let config = LongTailConfig::default();
        let weights = long_tail_weights(
            &[
                ("Civo", Availability::Unavailable),
                ("Paperspace", Availability::Unavailable),
            ],
            &config,
        );

        assert_eq!(weights.len(), 2);
        assert!((sum(&weights) - 1.0).abs() < 1e-9);
        // 0.15 vs 0.10 survives the common multiplier
        assert!((weights[0].normalized_weight - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_unavailable_is_down_weighted() {
        let config = LongTailConfig::default();
        let weights = long_tail_weights(
            &[("RunPod", Availability::High), ("Civo", Availability::Unavailable)],
            &config,
        );

        // Both have base 0.15
        assert!(weights[0].normalized_weight > weights[1].normalized_weight);
        assert!(weights[1].normalized_weight > 0.0);
    }

    #[test]
    fn test_empty_cohort() {
        assert!(long_tail_weights(&[], &LongTailConfig::default()).is_empty());
    }
}
