//! Deterministic synthetic market data.
//!
//! Used as a fallback when no real evidence is supplied and as a fixture
//! source for parity tests. Seeds come from an MD5 digest so the output is
//! stable across processes and platforms.

use crate::config::DEFAULT_SYNTHETIC_URL_MARKER;
use crate::models::*;
use chrono::{DateTime, Duration, Utc};
use md5::{Digest, Md5};
use tracing::debug;

/// Number of eBay sold points emitted per card
pub const EBAY_POINT_COUNT: i64 = 5;

/// Days between consecutive eBay sold points
pub const EBAY_SPACING_DAYS: i64 = 7;

/// Base value above which a PWCC point is emitted
pub const PWCC_MIN_BASE_VALUE: f64 = 50.0;

/// Stable integer seed: first 8 hex digits of the MD5 digest of `text`
pub fn stable_seed(text: &str) -> u64 {
    let digest = Md5::digest(text.as_bytes());
    u64::from(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
}

#[derive(Debug, Clone)]
pub struct MockDataFactory {
    marker: String,
}

impl Default for MockDataFactory {
    fn default() -> Self {
        Self { marker: DEFAULT_SYNTHETIC_URL_MARKER.to_string() }
    }
}

impl MockDataFactory {
    /// Factory whose URLs carry `marker`
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn generate(&self, card: &CardAttributes) -> Vec<MarketDataPoint> {
        self.generate_at(card, Utc::now())
    }

    /// Generate the fixed synthetic schedule relative to `now`
    pub fn generate_at(&self, card: &CardAttributes, now: DateTime<Utc>) -> Vec<MarketDataPoint> {
        let base = Self::base_value(card);
        let mut points = Vec::with_capacity(9);

        for i in 0..EBAY_POINT_COUNT {
            let seed = stable_seed(&format!("{}:ebay:{}", card.player, i));
            let variance = 1.0 + ((seed % 20) as f64 - 10.0) / 100.0;
            let days = i * EBAY_SPACING_DAYS;
            let date = now - Duration::days(days);
            points.push(
                self.synthetic("ebay_sold", base * variance, date, 3, card.condition)
                    .with_url(format!("https://ebay.com/itm/{}_{}", self.marker, seed % 99_999))
                    .with_notes(format!("Sold {days} days ago")),
            );
        }

        points.push(
            self.synthetic("130point", base * 1.05, now - Duration::days(5), 15, card.condition)
                .with_url(format!("https://130point.com/sales/{}", self.marker)),
        );

        if base > PWCC_MIN_BASE_VALUE {
            points.push(
                self.synthetic("pwcc", base * 1.2, now - Duration::days(10), 2, card.condition)
                    .with_url(format!("https://pwcc.com/{}", self.marker)),
            );
        }

        points.push(
            self.synthetic("comc", base * 0.95, now - Duration::days(3), 8, card.condition)
                .with_url(format!("https://comc.com/{}", self.marker)),
        );

        // Graded reference, always quoted at mint
        if !card.graded {
            let date = now - Duration::days(30);
            points.push(
                self.synthetic("psa_apr", base * 2.0, date, 5, CardCondition::Mint)
                    .with_url(format!("https://psacard.com/auctionprices/{}", self.marker))
                    .with_notes("PSA 9 reference price"),
            );
        }

        debug!(
            "Generated {} synthetic points for {} (base {:.2})",
            points.len(),
            card.player,
            base
        );
        points
    }

    /// Deterministic base price from the player seed and card attributes
    pub fn base_value(card: &CardAttributes) -> f64 {
        let mut base = (stable_seed(&card.player) % 100 + 10) as f64;

        if card.rookie {
            base *= 2.0;
        }
        if card.autograph {
            base *= 3.0;
        }
        if card.serial().is_some() {
            base *= 1.5;
        }
        if card.parallel_name().is_some() {
            base *= 1.3;
        }
        if card.year < 1980 {
            base *= 3.0;
        } else if card.year >= 2020 {
            base *= 1.2;
        } else if (1986..=1994).contains(&card.year) {
            base *= 0.3;
        }

        base.max(1.0)
    }

    fn synthetic(
        &self,
        source: &str,
        value: f64,
        date: DateTime<Utc>,
        sample_size: u32,
        condition: CardCondition,
    ) -> MarketDataPoint {
        let mut point =
            MarketDataPoint::new(source, round_to(value, 2), date, sample_size, condition);
        point.is_synthetic = true;
        point
    }
}
