//! Confidence scoring from the shape of the market data and how precisely
//! the card is identified.

use crate::aggregation::coefficient_of_variation;
use crate::config::{ValuationParameters, DEFAULT_RECENCY_WINDOW_DAYS};
use crate::models::*;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

const SOURCE_DIVERSITY_WEIGHT: f64 = 0.20;
const SAMPLE_SIZE_WEIGHT: f64 = 0.25;
const DATA_RECENCY_WEIGHT: f64 = 0.15;
const VALUE_CONSISTENCY_WEIGHT: f64 = 0.25;
const CARD_SPECIFICITY_WEIGHT: f64 = 0.15;

/// Distinct sources needed for full diversity credit
const FULL_DIVERSITY_SOURCES: f64 = 4.0;

/// Total samples needed for full sample-size credit
const FULL_SAMPLE_COUNT: f64 = 20.0;

/// Consistency assumed when there is too little data to measure it
const DEFAULT_CONSISTENCY: f64 = 0.5;

/// Computed confidence for one valuation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceAssessment {
    pub level: ConfidenceLevel,
    /// 0-100, rounded to one decimal
    pub score: f64,
    pub factors: AccuracyFactors,
}

#[derive(Debug, Clone)]
pub struct ConfidenceCalculator {
    recency_window: Duration,
}

impl Default for ConfidenceCalculator {
    fn default() -> Self {
        Self { recency_window: Duration::days(DEFAULT_RECENCY_WINDOW_DAYS) }
    }
}

impl ConfidenceCalculator {
    pub fn new(recency_window_days: i64) -> Self {
        Self { recency_window: Duration::days(recency_window_days) }
    }

    pub fn from_parameters(params: &ValuationParameters) -> Self {
        Self::new(params.recency_window_days)
    }

    pub fn calculate(
        &self,
        card: &CardAttributes,
        market_data: &[MarketDataPoint],
    ) -> ConfidenceAssessment {
        self.calculate_at(card, market_data, Utc::now())
    }

    /// Score against an explicit clock
    pub fn calculate_at(
        &self,
        card: &CardAttributes,
        market_data: &[MarketDataPoint],
        now: DateTime<Utc>,
    ) -> ConfidenceAssessment {
        let factors = AccuracyFactors {
            source_diversity: Self::source_diversity(market_data),
            sample_size: Self::sample_size(market_data),
            data_recency: self.data_recency(market_data, now),
            value_consistency: Self::value_consistency(market_data),
            card_specificity: Self::card_specificity(card),
        };

        let score = factors.source_diversity * SOURCE_DIVERSITY_WEIGHT * 100.0
            + factors.sample_size * SAMPLE_SIZE_WEIGHT * 100.0
            + factors.data_recency * DATA_RECENCY_WEIGHT * 100.0
            + factors.value_consistency * VALUE_CONSISTENCY_WEIGHT * 100.0
            + factors.card_specificity * CARD_SPECIFICITY_WEIGHT * 100.0;

        ConfidenceAssessment {
            level: ConfidenceLevel::from_score(score),
            score: round_to(score, 1),
            factors,
        }
    }

    fn source_diversity(market_data: &[MarketDataPoint]) -> f64 {
        let unique: HashSet<&MarketSource> = market_data.iter().map(|dp| &dp.source).collect();
        (unique.len() as f64 / FULL_DIVERSITY_SOURCES).min(1.0)
    }

    fn sample_size(market_data: &[MarketDataPoint]) -> f64 {
        let total: u64 = market_data.iter().map(|dp| u64::from(dp.sample_size)).sum();
        (total as f64 / FULL_SAMPLE_COUNT).min(1.0)
    }

    /// Fraction of points strictly newer than the recency cutoff
    fn data_recency(&self, market_data: &[MarketDataPoint], now: DateTime<Utc>) -> f64 {
        if market_data.is_empty() {
            return 0.0;
        }
        let cutoff = now - self.recency_window;
        let recent = market_data.iter().filter(|dp| dp.date > cutoff).count();
        recent as f64 / market_data.len() as f64
    }

    fn value_consistency(market_data: &[MarketDataPoint]) -> f64 {
        let values: Vec<f64> = market_data.iter().map(|dp| dp.value).collect();
        match coefficient_of_variation(&values) {
            Some(cv) => (1.0 - cv).max(0.0),
            None => DEFAULT_CONSISTENCY,
        }
    }

    fn card_specificity(card: &CardAttributes) -> f64 {
        let mut spec = 0.5;
        if card.serial().is_some() {
            spec += 0.2;
        }
        if card.parallel_name().is_some() {
            spec += 0.15;
        }
        if card.graded {
            spec += 0.15;
        }
        f64::min(1.0, spec)
    }
}
