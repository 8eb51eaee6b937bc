//! Provider classification
//!
//! A provider is an anchor when any alias of an anchor is a substring of
//! its lowercased, trimmed name. Aliases are expected in lowercase.
//! Anchors are tried in table order and the first match wins.

use common::Cohort;
use config::AnchorConfig;

/// Cohort and canonical key of one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub cohort: Cohort,
    /// Anchor id for anchors, the name as reported for long-tail providers
    pub key: String,
}

/// Classify a reported provider name against the anchor table
pub fn classify(provider_name: &str, anchors: &[AnchorConfig]) -> Classification {
    let normalized = provider_name.trim().to_lowercase();

    let anchor = anchors.iter().find(|anchor| {
        anchor
            .aliases
            .iter()
            .map(|alias| alias.trim())
            .any(|alias| !alias.is_empty() && normalized.contains(alias))
    });

    match anchor {
        Some(anchor) => Classification {
            cohort: Cohort::Anchor,
            key: anchor.id.clone(),
        },
        None => Classification {
            cohort: Cohort::LongTail,
            key: provider_name.to_string(),
        },
    }
}
