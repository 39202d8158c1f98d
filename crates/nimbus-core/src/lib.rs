//! # nimbus-core
//!
//! Core types for the NIMBUS weather-risk sensing network.
//!
//! This crate provides:
//! - [`Measurement`] for environmental readings
//! - [`RiskLevel`] labels for risk bands
//! - [`ValidationError`] for field validation
//! - Common error types

pub mod error;
pub mod measurement;
pub mod validation;

pub use error::NimbusError;
pub use measurement::{unix_timestamp, Measurement, RiskLevel};
pub use validation::{ValidationError, ValidationResult};
