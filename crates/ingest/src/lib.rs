//! Collector output ingestion
//!
//! Reads the per-provider JSON files written by the price collectors
//! and turns them into [`common::PriceReport`]s for the index engine.

pub mod document;
pub mod error;
pub mod loader;

pub use document::{extract_report, parse_eur, parse_usd, SkipReason};
pub use error::{IngestError, Result};
pub use loader::{load_input, load_report_snapshot, load_reports, LoadedReports, SkippedFile};
