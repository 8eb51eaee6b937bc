use std::collections::BTreeMap;

pub fn default_anchor_share() -> f64 {
    0.65
}

pub fn default_long_tail_share() -> f64 {
    0.35
}

pub fn default_anchor_discount() -> f64 {
    0.30
}

pub fn default_discounted_weight() -> f64 {
    0.80
}

pub fn default_list_weight() -> f64 {
    0.20
}

pub fn default_anchors() -> Vec<super::AnchorConfig> {
    use super::AnchorConfig;

    vec![
        AnchorConfig::new("AWS", &["aws", "amazon", "p4d"], 0.42, 0.44),
        AnchorConfig::new("Azure", &["azure", "microsoft", "nd96"], 0.33, 0.65),
        AnchorConfig::new("GCP", &["gcp", "google", "google cloud", "a2-highgpu"], 0.17, 0.65),
        AnchorConfig::new("Oracle", &["oracle", "oci", "bm.gpu"], 0.08, 0.25),
    ]
}

pub fn default_base_weights() -> BTreeMap<String, f64> {
    [
        ("Civo", 0.15),
        // Marketplaces carry more concurrent-price volatility
        ("Vast.ai", 0.15),
        ("CUDO Compute", 0.12),
        ("HyperStack", 0.12),
        ("RunPod", 0.15),
        ("Paperspace", 0.10),
        ("Hostkey", 0.08),
        ("Lambda Labs", 0.13),
    ]
    .into_iter()
    .map(|(name, weight)| (name.to_string(), weight))
    .collect()
}

pub fn default_long_tail_weight() -> f64 {
    0.05
}

pub fn default_high_multiplier() -> f64 {
    1.20
}

pub fn default_unit_multiplier() -> f64 {
    1.00
}

pub fn default_low_multiplier() -> f64 {
    0.70
}

pub fn default_unavailable_multiplier() -> f64 {
    0.30
}

pub fn default_primary_rate_url() -> Option<String> {
    Some("https://api.exchangerate-api.com/v4/latest/EUR".to_string())
}

pub fn default_fallback_rate_url() -> Option<String> {
    Some("https://open.er-api.com/v6/latest/EUR".to_string())
}

pub fn default_rate_timeout() -> u64 {
    10
}

pub fn default_exchange_rate() -> f64 {
    1.08
}

pub fn default_quote_currency() -> String {
    "USD".to_string()
}

pub fn default_max_change_percent() -> f64 {
    20.0
}

pub fn default_history_path() -> String {
    "gpu_index_history.jsonl".to_string()
}

pub fn default_history_table() -> String {
    "gpu_index_prices".to_string()
}

pub fn default_input_dir() -> String {
    ".".to_string()
}

pub fn default_file_suffix() -> String {
    "_a100_prices.json".to_string()
}

pub fn default_report_output() -> String {
    "gpu_weighted_index.json".to_string()
}
