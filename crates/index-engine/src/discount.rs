//! Anchor discount model
//!
//! Hyperscaler list prices overstate what committed customers pay. The
//! effective price blends the discounted price with the list price.

use config::DiscountBlendConfig;

use crate::types::EffectivePrice;

/// Effective price of an anchor given its discount rate
pub fn effective_price(
    original_price: f64,
    discount_rate: f64,
    blend: &DiscountBlendConfig,
) -> EffectivePrice {
    let discounted_price = original_price * (1.0 - discount_rate);
    let blended_price =
        discounted_price * blend.discounted_weight + original_price * blend.list_weight;

    EffectivePrice {
        original_price,
        discount_rate,
        discounted_price,
        blended_price,
    }
}
