//! Weighted index calculation
//!
//! The index is the anchor component plus the long-tail component. Each
//! cohort contributes at most its configured share; when only some
//! anchors reported, the anchor cohort is scaled back up to its share.

use common::Availability;
use config::IndexConfig;
use tracing::{debug, warn};

use crate::discount::effective_price;
use crate::types::{AnchorDetail, LongTailDetail};
use crate::weighting::long_tail_weights;

/// An anchor's price for one run, in the reference currency
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorQuote {
    pub anchor: String,
    pub provider_name: String,
    pub price: f64,
    pub availability: Availability,
}

/// A long-tail provider's price for one run, in the reference currency
#[derive(Debug, Clone, PartialEq)]
pub struct LongTailQuote {
    pub provider_name: String,
    pub price: f64,
    pub availability: Availability,
    pub gpu_count: Option<u32>,
}

/// Components and per-provider details of one index value
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedIndex {
    /// Rounded to 2 decimal places
    pub final_index_price: f64,
    pub anchor_component: f64,
    pub long_tail_component: f64,
    pub anchor_details: Vec<AnchorDetail>,
    pub long_tail_details: Vec<LongTailDetail>,
}

/// Round a price to cents
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Combine both cohorts into one index value
pub fn combine(
    anchors: &[AnchorQuote],
    long_tail: &[LongTailQuote],
    config: &IndexConfig,
) -> CombinedIndex {
    let (anchor_component, anchor_details) = anchor_component(anchors, config);
    let (long_tail_component, long_tail_details) =
        long_tail_component(long_tail, !anchor_details.is_empty(), config);

    CombinedIndex {
        final_index_price: round_price(anchor_component + long_tail_component),
        anchor_component,
        long_tail_component,
        anchor_details,
        long_tail_details,
    }
}

fn anchor_component(anchors: &[AnchorQuote], config: &IndexConfig) -> (f64, Vec<AnchorDetail>) {
    let share = config.index.anchor_share;
    let mut details = Vec::with_capacity(anchors.len());
    let mut used_weight = 0.0;

    for quote in anchors {
        let Some(anchor) = config.anchor(&quote.anchor) else {
            warn!(anchor = %quote.anchor, "Anchor has no configured weight, excluded");
            continue;
        };

        let effective = effective_price(quote.price, anchor.discount, &config.discount_blend);
        let applied_weight = anchor.weight * share;
        used_weight += applied_weight;

        details.push(AnchorDetail {
            anchor: anchor.id.clone(),
            provider_name: quote.provider_name.clone(),
            availability: quote.availability,
            effective,
            weight: anchor.weight,
            applied_weight,
            contribution: effective.blended_price * applied_weight,
        });
    }

    // Missing anchors: bring the present ones back up to the cohort share
    if used_weight > 0.0 && used_weight < share {
        let scale = share / used_weight;
        debug!(used_weight, share, scale, "Rescaling anchor cohort");
        for detail in &mut details {
            detail.applied_weight *= scale;
            detail.contribution *= scale;
        }
    }

    for detail in &details {
        debug!(
            anchor = %detail.anchor,
            effective = detail.effective.blended_price,
            weight = detail.applied_weight,
            contribution = detail.contribution,
            "Anchor contribution"
        );
    }

    let component = details.iter().map(|d| d.contribution).sum();
    (component, details)
}

fn long_tail_component(
    long_tail: &[LongTailQuote],
    anchors_present: bool,
    config: &IndexConfig,
) -> (f64, Vec<LongTailDetail>) {
    let providers: Vec<(&str, Availability)> = long_tail
        .iter()
        .map(|q| (q.provider_name.as_str(), q.availability))
        .collect();
    let weights = long_tail_weights(&providers, &config.long_tail);

    let mut share = config.index.long_tail_share;
    if !anchors_present && config.index.redistribute_missing_anchor_share && share > 0.0 {
        debug!("No anchors reported, long-tail cohort takes the full index");
        share = 1.0;
    }

    let details: Vec<LongTailDetail> = long_tail
        .iter()
        .zip(weights)
        .map(|(quote, weight)| {
            let applied_weight = weight.normalized_weight * share;
            let contribution = quote.price * applied_weight;
            debug!(
                provider = %quote.provider_name,
                price = quote.price,
                weight = applied_weight,
                contribution,
                "Long-tail contribution"
            );

            LongTailDetail {
                provider_name: quote.provider_name.clone(),
                price: quote.price,
                availability: quote.availability,
                base_weight: weight.base_weight,
                multiplier: weight.multiplier,
                normalized_weight: weight.normalized_weight,
                applied_weight,
                contribution,
                gpu_count: quote.gpu_count,
            }
        })
        .collect();

    let component = details.iter().map(|d| d.contribution).sum();
    (component, details)
}
