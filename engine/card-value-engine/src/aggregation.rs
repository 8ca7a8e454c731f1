//! # Market Data Aggregation
//!
//! Collapses market data points into a single base value and provides the
//! small statistics toolkit shared by the confidence and trend calculations.

use crate::models::{MarketDataPoint, MarketSource};
use tracing::{debug, warn};

/// Number of points per source at which its weight stops growing
const FULL_WEIGHT_SAMPLE_COUNT: f64 = 10.0;

/// Arithmetic mean; 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median, averaging the two middle values for even lengths; 0.0 for an empty slice
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Sample standard deviation (n - 1 denominator); `None` below two values
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Sample standard deviation over mean; `None` below two values or with a non-positive mean
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let std_dev = sample_std_dev(values)?;
    let m = mean(values);
    if m > 0.0 {
        Some(std_dev / m)
    } else {
        None
    }
}

/// Group point values by source, keeping first-seen source order
pub fn group_by_source(market_data: &[MarketDataPoint]) -> Vec<(MarketSource, Vec<f64>)> {
    let mut groups: Vec<(MarketSource, Vec<f64>)> = Vec::new();
    for dp in market_data {
        match groups.iter_mut().find(|(source, _)| *source == dp.source) {
            Some((_, values)) => values.push(dp.value),
            None => groups.push((dp.source.clone(), vec![dp.value])),
        }
    }
    groups
}

/// Trust-weighted average of per-source medians.
///
/// Each source contributes its median, weighted by its trust weight damped by
/// `min(1, count / 10)`. Falls back to the plain mean when no weight survives.
pub fn weighted_value(market_data: &[MarketDataPoint]) -> f64 {
    if market_data.is_empty() {
        return 0.0;
    }

    let groups = group_by_source(market_data);

    // A lone source's weighted average is exactly its median
    if let [(source, values)] = groups.as_slice() {
        if source.trust_weight() > 0.0 {
            return median(values);
        }
    }

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for (source, values) in groups {
        let source_median = median(&values);
        let damping = (values.len() as f64 / FULL_WEIGHT_SAMPLE_COUNT).min(1.0);
        let weight = source.trust_weight() * damping;

        debug!(
            "Source {}: median {:.2} over {} points, weight {:.4}",
            source,
            source_median,
            values.len(),
            weight
        );

        weighted_sum += source_median * weight;
        total_weight += weight;
    }

    if total_weight == 0.0 {
        let values: Vec<f64> = market_data.iter().map(|dp| dp.value).collect();
        warn!("Zero total source weight, falling back to plain mean");
        return mean(&values);
    }

    weighted_sum / total_weight
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CardCondition;
    use chrono::{TimeZone, Utc};

    fn point(source: &str, value: f64) -> MarketDataPoint {
        let date = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        MarketDataPoint::new(source, value, date, 1, CardCondition::Raw)
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_sample_std_dev() {
        assert!(sample_std_dev(&[5.0]).is_none());
        let sd = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138_089_935).abs() < 1e-6);
    }

    #[test]
    fn test_coefficient_of_variation_guards() {
        assert!(coefficient_of_variation(&[10.0]).is_none());
        assert!(coefficient_of_variation(&[0.0, 0.0]).is_none());
        let cv = coefficient_of_variation(&[10.0, 30.0]).unwrap();
        assert!((cv - (200f64.sqrt() / 20.0)).abs() < 1e-12);
    }

    #[test]
    fn test_single_source_equals_its_median() {
        let data = vec![point("comc", 10.0), point("comc", 50.0), point("comc", 12.0)];
        assert_eq!(weighted_value(&data), 12.0);
    }

    #[test]
    fn test_weighted_value_mixes_sources() {
        // ebay: 1 point, weight .35 * .1; comc: 1 point, weight .10 * .1
        let data = vec![point("ebay_sold", 100.0), point("comc", 10.0)];
        let expected = (100.0 * 0.035 + 10.0 * 0.01) / (0.035 + 0.01);
        assert!((weighted_value(&data) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_source_uses_default_weight() {
        let data = vec![point("ebay_sold", 100.0), point("myslabs", 10.0)];
        let expected = (100.0 * 0.035 + 10.0 * 0.005) / (0.035 + 0.005);
        assert!((weighted_value(&data) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_group_by_source_keeps_first_seen_order() {
        let data = vec![point("comc", 1.0), point("ebay_sold", 2.0), point("comc", 3.0)];
        let groups = group_by_source(&data);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, MarketSource::Comc);
        assert_eq!(groups[0].1, vec![1.0, 3.0]);
        assert_eq!(groups[1].0, MarketSource::EbaySold);
    }

    #[test]
    fn test_empty_data_is_zero() {
        assert_eq!(weighted_value(&[]), 0.0);
    }
}
