//! # Accuracy Validation
//!
//! Offline backtesting: compares past estimates against realised sale prices
//! and keeps an ordered history for aggregate reporting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aggregation::{mean, median};
use crate::error::{Result, ValuationError};
use crate::models::{round_to, ConfidenceLevel, ValueEstimate};

/// Outcome of checking one estimate against a realised price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub estimated: f64,
    pub actual: f64,
    pub error: f64,
    pub error_pct: f64,
    pub accuracy_pct: f64,
    pub in_range: bool,
    pub confidence: ConfidenceLevel,
    pub confidence_score: f64,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate over the validation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    pub overall_accuracy: f64,
    pub median_accuracy: f64,
    pub in_range_pct: f64,
    pub total: usize,
}

#[derive(Debug, Default)]
pub struct AccuracyValidator {
    history: Vec<ValidationRecord>,
}

impl AccuracyValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&mut self, estimate: &ValueEstimate, actual_price: f64) -> ValidationRecord {
        self.validate_at(estimate, actual_price, Utc::now())
    }

    /// Record one comparison. A non-positive actual price counts as 100% error.
    pub fn validate_at(
        &mut self,
        estimate: &ValueEstimate,
        actual_price: f64,
        now: DateTime<Utc>,
    ) -> ValidationRecord {
        let error = (estimate.estimated_value - actual_price).abs();
        let error_pct = if actual_price > 0.0 { error / actual_price * 100.0 } else { 100.0 };
        let accuracy = (100.0 - error_pct).max(0.0);
        let (low, high) = estimate.value_range;

        let record = ValidationRecord {
            estimated: estimate.estimated_value,
            actual: actual_price,
            error: round_to(error, 2),
            error_pct: round_to(error_pct, 2),
            accuracy_pct: round_to(accuracy, 2),
            in_range: low <= actual_price && actual_price <= high,
            confidence: estimate.confidence,
            confidence_score: estimate.confidence_score,
            timestamp: now,
        };

        info!(
            "Validated estimate ${:.2} against sale ${:.2}: accuracy {:.2}%, in range: {}",
            record.estimated, record.actual, record.accuracy_pct, record.in_range
        );

        self.history.push(record.clone());
        record
    }

    /// Like `validate`, but rejects a non-positive sale price
    pub fn validate_strict(
        &mut self,
        estimate: &ValueEstimate,
        actual_price: f64,
    ) -> Result<ValidationRecord> {
        if !(actual_price > 0.0) {
            return Err(ValuationError::InvalidPrice(actual_price));
        }
        Ok(self.validate(estimate, actual_price))
    }

    pub fn history(&self) -> &[ValidationRecord] {
        &self.history
    }

    pub fn report(&self) -> AccuracyReport {
        if self.history.is_empty() {
            return AccuracyReport {
                overall_accuracy: 0.0,
                median_accuracy: 0.0,
                in_range_pct: 0.0,
                total: 0,
            };
        }

        let accuracies: Vec<f64> = self.history.iter().map(|r| r.accuracy_pct).collect();
        let in_range = self.history.iter().filter(|r| r.in_range).count();

        AccuracyReport {
            overall_accuracy: round_to(mean(&accuracies), 1),
            median_accuracy: round_to(median(&accuracies), 1),
            in_range_pct: round_to(in_range as f64 / self.history.len() as f64 * 100.0, 1),
            total: self.history.len(),
        }
    }
}
