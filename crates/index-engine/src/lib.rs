//! GPU rental index engine
//!
//! Aggregates per-provider GPU rental prices into one weighted index
//! value per run and gates changes against the last committed value.
//!
//! # Core Components
//!
//! - [`fx`] - Currency normalization with a per-run rate cache
//! - [`classifier`] - Anchor / long-tail classification by alias
//! - [`discount`] - Anchor effective-price model
//! - [`weighting`] - Availability-adjusted long-tail weights
//! - [`calculator`] - Cohort components and final index
//! - [`gate`] - Change gate in front of the history store
//! - [`engine`] - Engine and pipeline wiring the above together
//!
//! # Key Invariants
//!
//! - Each cohort contributes at most its configured share
//! - Long-tail weights are renormalized over the providers present
//! - A gate rejection is an outcome, not an error

pub mod calculator;
pub mod classifier;
pub mod discount;
pub mod engine;
pub mod error;
pub mod fx;
pub mod gate;
pub mod types;
pub mod weighting;

pub use engine::{availability_summary, IndexEngine, IndexPipeline, RunOutcome};
pub use error::{IndexError, Result};
pub use fx::{CurrencyNormalizer, FixedRateSource, HttpRateSource, RateProvider, RateSource};
pub use gate::{ChangeGate, GateMetadata, GateOutcome};
pub use types::{
    AnchorDetail, EffectivePrice, ExchangeRate, IndexParameters, IndexResult, LongTailDetail,
    RateOrigin,
};
