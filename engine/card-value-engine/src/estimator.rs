use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    aggregation::weighted_value,
    confidence::ConfidenceCalculator,
    config::{EngineConfig, ValuationParameters},
    error::{Result, ValuationError},
    mock_data::MockDataFactory,
    models::*,
    multiplier::MultiplierEngine,
    trend::market_trend,
};

/// Note recorded when real sold comps make multipliers redundant
pub const MULTIPLIERS_SKIPPED_NOTE: &str = "multipliers skipped — real sold comp data";

/// Narrowest half-width of the value range, as a fraction of the value
const MIN_RANGE_VARIANCE: f64 = 0.05;

/// Orchestrates a full valuation: aggregation, multipliers, confidence,
/// range, trend and grading advice.
///
/// Holds no mutable state, so one instance can be shared across threads.
#[derive(Debug, Clone)]
pub struct CardValueEstimator {
    params: ValuationParameters,
    multipliers: MultiplierEngine,
    confidence: ConfidenceCalculator,
    mock_factory: MockDataFactory,
}

impl Default for CardValueEstimator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl CardValueEstimator {
    pub fn new(config: &EngineConfig) -> Self {
        let params = config.valuation.clone();
        Self {
            multipliers: MultiplierEngine::from_parameters(&params),
            confidence: ConfidenceCalculator::from_parameters(&params),
            mock_factory: MockDataFactory::new(params.synthetic_url_marker.clone()),
            params,
        }
    }

    pub fn mock_factory(&self) -> &MockDataFactory {
        &self.mock_factory
    }

    /// Whether callers should fall back to synthetic data by default
    pub fn use_mock_by_default(&self) -> bool {
        self.params.use_mock_by_default
    }

    /// Estimate a card's value.
    ///
    /// With `market_data` absent or empty, synthetic data is generated when
    /// `use_mock` is set and `ValuationError::NoMarketData` is returned otherwise.
    pub fn estimate_value(
        &self,
        card: &CardAttributes,
        market_data: Option<Vec<MarketDataPoint>>,
        use_mock: bool,
    ) -> Result<ValueEstimate> {
        self.estimate_value_at(card, market_data, use_mock, Utc::now())
    }

    /// Estimate against an explicit clock
    pub fn estimate_value_at(
        &self,
        card: &CardAttributes,
        market_data: Option<Vec<MarketDataPoint>>,
        use_mock: bool,
        now: DateTime<Utc>,
    ) -> Result<ValueEstimate> {
        let market_data = match market_data.filter(|data| !data.is_empty()) {
            Some(data) => data,
            None if use_mock => {
                debug!("No market data for {}, generating synthetic data", card.player);
                self.mock_factory.generate_at(card, now)
            }
            None => return Err(ValuationError::NoMarketData),
        };

        let base_value = weighted_value(&market_data);

        let has_real_data =
            market_data.iter().any(|dp| dp.is_real_sold_comp(self.mock_factory.marker()));

        let (estimated_value, multipliers_applied) = if has_real_data {
            debug!("Real sold comps present for {}, skipping multipliers", card.player);
            (
                round_to(base_value, 2),
                MultiplierBreakdown::Skipped { note: MULTIPLIERS_SKIPPED_NOTE.to_string() },
            )
        } else {
            self.multipliers.apply_all(base_value, card)
        };

        let assessment = self.confidence.calculate_at(card, &market_data, now);
        let value_range = Self::value_range(estimated_value, assessment.score);
        let market_trends = market_trend(&market_data);
        let grading_recommendation = Self::grading_recommendation(card, estimated_value);

        info!(
            "Estimated {} {} {}: ${:.2} (range ${:.2}-${:.2}, confidence {} {:.1})",
            card.year,
            card.set_name,
            card.player,
            estimated_value,
            value_range.0,
            value_range.1,
            assessment.level,
            assessment.score
        );

        Ok(ValueEstimate {
            estimated_value,
            confidence: assessment.level,
            confidence_score: assessment.score,
            value_range,
            data_points: market_data,
            market_trends,
            grading_recommendation,
            accuracy_factors: assessment.factors,
            multipliers_applied,
            timestamp: now,
        })
    }

    /// Range around `value` that narrows as confidence grows, never below ±5%
    pub fn value_range(value: f64, confidence_score: f64) -> (f64, f64) {
        let variance = (0.5 - confidence_score / 200.0).max(MIN_RANGE_VARIANCE);
        (round_to(value * (1.0 - variance), 2), round_to(value * (1.0 + variance), 2))
    }

    /// Grade-or-not advice for raw cards; `None` once a card is graded
    pub fn grading_recommendation(card: &CardAttributes, value: f64) -> Option<String> {
        if card.graded {
            return None;
        }
        let advice = if value < 20.0 {
            "Not worth grading unless gem mint condition"
        } else if value < 50.0 {
            "Consider grading if confident in 9+ grade"
        } else if value < 100.0 {
            "Grading recommended if NM+ or better"
        } else if value < 500.0 {
            "Definitely grade if NM or better"
        } else {
            "High value — professional grading essential"
        };
        Some(advice.to_string())
    }
}
