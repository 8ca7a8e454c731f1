use crate::aggregation::{coefficient_of_variation, mean};
use crate::models::*;

/// Points needed on each end of the series before a trend is reported
const TREND_WINDOW: usize = 3;

/// Summarise price movement between the oldest and newest points.
///
/// Compares the mean of the latest three points against the earliest three.
/// The 30-day figure is half of the full-span change, not a windowed value.
pub fn market_trend(market_data: &[MarketDataPoint]) -> MarketTrend {
    let mut trend = MarketTrend::default();

    if market_data.len() < TREND_WINDOW {
        return trend;
    }

    let mut sorted: Vec<&MarketDataPoint> = market_data.iter().collect();
    sorted.sort_by_key(|dp| dp.date);
    let values: Vec<f64> = sorted.iter().map(|dp| dp.value).collect();

    let older_avg = mean(&values[..TREND_WINDOW]);
    let recent_avg = mean(&values[values.len() - TREND_WINDOW..]);

    let change_pct =
        if older_avg > 0.0 { (recent_avg - older_avg) / older_avg * 100.0 } else { 0.0 };

    if change_pct > 10.0 {
        trend.direction = TrendDirection::Up;
        trend.recommendation = if change_pct > 30.0 {
            TrendRecommendation::SellHigh
        } else {
            TrendRecommendation::Hold
        };
    } else if change_pct < -10.0 {
        trend.direction = TrendDirection::Down;
        trend.recommendation = if change_pct < -20.0 {
            TrendRecommendation::BuyLow
        } else {
            TrendRecommendation::Hold
        };
    }

    trend.change_30_day = round_to(change_pct / 2.0, 1);
    trend.change_90_day = round_to(change_pct, 1);

    if let Some(cv) = coefficient_of_variation(&values) {
        trend.volatility = if cv > 0.3 {
            Volatility::High
        } else if cv > 0.15 {
            Volatility::Medium
        } else {
            Volatility::Low
        };
    }

    trend
}
