//! Common types and utilities for the GPU index
//!
//! This crate provides shared types and errors used across
//! all index crates.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Shared domain types (PriceReport, Currency, Availability, etc.)

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
