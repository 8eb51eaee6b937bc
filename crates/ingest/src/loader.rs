//! Directory and snapshot loading

use common::PriceReport;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::document::{extract_report, SkipReason};
use crate::error::{IngestError, Result};

/// A collector file that produced no report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// Result of scanning a directory of collector outputs
#[derive(Debug, Default)]
pub struct LoadedReports {
    pub reports: Vec<PriceReport>,
    pub skipped: Vec<SkippedFile>,
}

/// Load every `*<suffix>` file in `dir` into a price report
///
/// Files are visited in name order so repeated runs over the same
/// directory produce the same report order. An unreadable directory or
/// file is an error; malformed files, files the collector marked failed
/// and files that carry no price are recorded in `skipped`.
pub fn load_reports(dir: impl AsRef<Path>, suffix: &str) -> Result<LoadedReports> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|source| IngestError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(suffix))
        })
        .collect();
    paths.sort();

    let mut loaded = LoadedReports::default();
    for path in paths {
        let fallback = fallback_name(&path, suffix);
        let extracted = read_json(&path)?
            .map_err(|e| SkipReason::Malformed(e.to_string()))
            .and_then(|doc| extract_report(&doc, &fallback));

        match extracted {
            Ok(report) => {
                debug!(
                    path = ?path,
                    provider = %report.provider_name,
                    price = report.canonical_price(),
                    currency = %report.currency,
                    "Loaded price report"
                );
                loaded.reports.push(report);
            }
            Err(reason) => {
                warn!(path = ?path, reason = %reason, "Skipping collector output");
                loaded.skipped.push(SkippedFile { path, reason });
            }
        }
    }

    info!(
        dir = ?dir,
        reports = loaded.reports.len(),
        skipped = loaded.skipped.len(),
        "Collector outputs loaded"
    );
    Ok(loaded)
}

/// Load a JSON array of already-normalized price reports
pub fn load_report_snapshot(path: impl AsRef<Path>) -> Result<Vec<PriceReport>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let reports: Vec<PriceReport> =
        serde_json::from_str(&content).map_err(|e| IngestError::InvalidDocument {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    info!(path = ?path, reports = reports.len(), "Report snapshot loaded");
    Ok(reports)
}

/// Load either a collector directory or a snapshot file
pub fn load_input(input: impl AsRef<Path>, suffix: &str) -> Result<Vec<PriceReport>> {
    let input = input.as_ref();
    if input.is_dir() {
        Ok(load_reports(input, suffix)?.reports)
    } else {
        load_report_snapshot(input)
    }
}

/// Outer error is I/O, inner is the parse result
fn read_json(path: &Path) -> Result<std::result::Result<Value, serde_json::Error>> {
    let content = fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(serde_json::from_str(&content))
}

/// Provider name derived from a file name such as `runpod_a100_prices.json`
fn fallback_name(path: &Path, suffix: &str) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    name.strip_suffix(suffix).unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Availability, Currency};

    const SUFFIX: &str = "_a100_prices.json";

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gpu-index-ingest-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_load_directory() {
        let dir = temp_dir();
        std::fs::write(
            dir.join(format!("aws{SUFFIX}")),
            r#"{"provider": "AWS", "providers": {"AWS": {"variants": {"p4d": {"price_per_hour": 4.1, "currency": "USD"}}}}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(format!("genesis{SUFFIX}")),
            r#"{"prices": {"A100": "€1.45/hr"}, "availability": "low"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join(format!("civo{SUFFIX}")),
            r#"{"provider": "Civo", "fetch_status": "failed", "prices": {}}"#,
        )
        .unwrap();
        std::fs::write(dir.join("notes.json"), r#"{"prices": {"A100": "$9"}}"#).unwrap();

        let loaded = load_reports(&dir, SUFFIX).unwrap();

        assert_eq!(loaded.reports.len(), 2);
        assert_eq!(loaded.reports[0].provider_name, "AWS");
        assert_eq!(loaded.reports[1].provider_name, "genesis");
        assert_eq!(loaded.reports[1].currency, Currency::Eur);
        assert_eq!(loaded.reports[1].availability, Availability::Low);
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].reason, SkipReason::FetchFailed);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_is_skipped() {
        let dir = temp_dir();
        std::fs::write(dir.join(format!("bad{SUFFIX}")), "{not json").unwrap();
        std::fs::write(
            dir.join(format!("ok{SUFFIX}")),
            r#"{"prices": {"A100": "$1.10"}}"#,
        )
        .unwrap();

        let loaded = load_reports(&dir, SUFFIX).unwrap();
        assert_eq!(loaded.reports.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);
        assert!(matches!(loaded.skipped[0].reason, SkipReason::Malformed(_)));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_directory() {
        let err = load_reports("/nonexistent/gpu-index", SUFFIX).unwrap_err();
        assert!(matches!(err, IngestError::Io { .. }));
    }

    #[test]
    fn test_snapshot() {
        let dir = temp_dir();
        let path = dir.join("reports.json");
        std::fs::write(
            &path,
            r#"[
                {"provider_name": "AWS", "raw_price": 4.1, "currency": "USD", "availability": "high"},
                {"provider_name": "RunPod", "raw_price": 1.89}
            ]"#,
        )
        .unwrap();

        let reports = load_input(&path, SUFFIX).unwrap();
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[1].currency, Currency::Usd);
        assert_eq!(reports[1].availability, Availability::Unknown);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(fallback_name(Path::new("/x/runpod_a100_prices.json"), SUFFIX), "runpod");
        assert_eq!(fallback_name(Path::new("other.json"), SUFFIX), "other.json");
    }
}
