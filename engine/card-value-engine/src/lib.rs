//! Card Value Engine
//!
//! Estimates the market value of a trading card from its attributes and
//! optional sales evidence. Produces a point estimate, a confidence score,
//! a value range, a trend narrative and grading advice. Every component is
//! a pure computation over in-memory values.

pub mod aggregation;
pub mod cli;
pub mod config;
pub mod confidence;
pub mod error;
pub mod estimator;
pub mod logging;
pub mod mock_data;
pub mod models;
pub mod multiplier;
pub mod record;
pub mod trend;
pub mod validator;

#[cfg(test)]
mod tests;

pub use confidence::{ConfidenceAssessment, ConfidenceCalculator};
pub use config::EngineConfig;
pub use error::{Result, ValuationError};
pub use estimator::CardValueEstimator;
pub use mock_data::MockDataFactory;
pub use models::*;
pub use multiplier::MultiplierEngine;
pub use record::CardRecord;
pub use validator::{AccuracyReport, AccuracyValidator, ValidationRecord};

/// Current version of the engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
