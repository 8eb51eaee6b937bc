use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<IndexConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    let substituted = substitution::substitute_env_vars(&content)?;
    debug!("Environment variable substitution completed");

    let config: IndexConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!(gpu_model = %config.index.gpu_model, "Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> IndexConfig {
    use defaults::*;

    IndexConfig {
        index: IndexSettings {
            gpu_model: "A100".to_string(),
            anchor_share: default_anchor_share(),
            long_tail_share: default_long_tail_share(),
            redistribute_missing_anchor_share: false,
        },
        anchors: default_anchors(),
        discount_blend: DiscountBlendConfig::default(),
        long_tail: LongTailConfig::default(),
        exchange_rate: ExchangeRateConfig::default(),
        gate: GateConfig::default(),
        storage: StorageConfig::default(),
        ingest: IngestConfig::default(),
    }
}

#[instrument(skip(config))]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &IndexConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}
