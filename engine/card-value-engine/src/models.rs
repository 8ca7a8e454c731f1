use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Sport the card belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Basketball,
    Football,
    Baseball,
    Soccer,
    Hockey,
    #[default]
    Other,
}

impl Sport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Basketball => "basketball",
            Sport::Football => "football",
            Sport::Baseball => "baseball",
            Sport::Soccer => "soccer",
            Sport::Hockey => "hockey",
            Sport::Other => "other",
        }
    }
}

impl FromStr for Sport {
    type Err = Infallible;

    /// Case-insensitive; anything unrecognised is `Other`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "basketball" => Sport::Basketball,
            "football" => Sport::Football,
            "baseball" => Sport::Baseball,
            "soccer" => Sport::Soccer,
            "hockey" => Sport::Hockey,
            _ => Sport::Other,
        })
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Physical condition of the card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardCondition {
    GemMint,
    Mint,
    #[serde(alias = "nm_plus")]
    NearMintPlus,
    NearMint,
    Excellent,
    VeryGood,
    Good,
    #[default]
    Raw,
}

impl CardCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            CardCondition::GemMint => "gem_mint",
            CardCondition::Mint => "mint",
            CardCondition::NearMintPlus => "near_mint_plus",
            CardCondition::NearMint => "near_mint",
            CardCondition::Excellent => "excellent",
            CardCondition::VeryGood => "very_good",
            CardCondition::Good => "good",
            CardCondition::Raw => "raw",
        }
    }
}

impl FromStr for CardCondition {
    type Err = Infallible;

    /// Lower-cased with spaces folded to underscores; unknown text is `Raw`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "gem_mint" => CardCondition::GemMint,
            "mint" => CardCondition::Mint,
            "nm_plus" | "near_mint_plus" => CardCondition::NearMintPlus,
            "near_mint" => CardCondition::NearMint,
            "excellent" => CardCondition::Excellent,
            "very_good" => CardCondition::VeryGood,
            "good" => CardCondition::Good,
            _ => CardCondition::Raw,
        })
    }
}

impl fmt::Display for CardCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured attributes of a single card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardAttributes {
    pub player: String,
    pub year: i32,
    pub set_name: String,
    pub card_number: String,
    #[serde(default)]
    pub sport: Sport,
    #[serde(default)]
    pub parallel: Option<String>,
    /// Expected as `current/total`, e.g. "23/25"
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub autograph: bool,
    #[serde(default)]
    pub rookie: bool,
    #[serde(default)]
    pub insert: bool,
    #[serde(default)]
    pub condition: CardCondition,
    #[serde(default)]
    pub graded: bool,
    #[serde(default)]
    pub grade_value: Option<f64>,
    #[serde(default)]
    pub grading_company: Option<String>,
}

impl CardAttributes {
    /// Create a raw, ungraded base card
    pub fn new(
        player: impl Into<String>,
        year: i32,
        set_name: impl Into<String>,
        card_number: impl Into<String>,
    ) -> Self {
        Self {
            player: player.into(),
            year,
            set_name: set_name.into(),
            card_number: card_number.into(),
            sport: Sport::Other,
            parallel: None,
            serial_number: None,
            autograph: false,
            rookie: false,
            insert: false,
            condition: CardCondition::Raw,
            graded: false,
            grade_value: None,
            grading_company: None,
        }
    }

    /// Parallel name, treating empty text as absent
    pub fn parallel_name(&self) -> Option<&str> {
        self.parallel.as_deref().filter(|p| !p.is_empty())
    }

    /// Serial number, treating empty text as absent
    pub fn serial(&self) -> Option<&str> {
        self.serial_number.as_deref().filter(|s| !s.is_empty())
    }
}

/// Where a market data point came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MarketSource {
    EbaySold,
    OneThirtyPoint,
    Pwcc,
    Comc,
    Beckett,
    PsaApr,
    Sportlots,
    Other(String),
}

impl MarketSource {
    pub fn as_str(&self) -> &str {
        match self {
            MarketSource::EbaySold => "ebay_sold",
            MarketSource::OneThirtyPoint => "130point",
            MarketSource::Pwcc => "pwcc",
            MarketSource::Comc => "comc",
            MarketSource::Beckett => "beckett",
            MarketSource::PsaApr => "psa_apr",
            MarketSource::Sportlots => "sportlots",
            MarketSource::Other(name) => name,
        }
    }

    /// Fixed trust weight used when aggregating sources
    pub fn trust_weight(&self) -> f64 {
        match self {
            MarketSource::EbaySold => 0.35,
            MarketSource::OneThirtyPoint => 0.20,
            MarketSource::Pwcc => 0.15,
            MarketSource::Comc => 0.10,
            MarketSource::Beckett => 0.08,
            MarketSource::PsaApr => 0.07,
            MarketSource::Sportlots => 0.05,
            MarketSource::Other(_) => 0.05,
        }
    }
}

impl From<String> for MarketSource {
    fn from(s: String) -> Self {
        match s.as_str() {
            "ebay_sold" => MarketSource::EbaySold,
            "130point" => MarketSource::OneThirtyPoint,
            "pwcc" => MarketSource::Pwcc,
            "comc" => MarketSource::Comc,
            "beckett" => MarketSource::Beckett,
            "psa_apr" => MarketSource::PsaApr,
            "sportlots" => MarketSource::Sportlots,
            _ => MarketSource::Other(s),
        }
    }
}

impl From<&str> for MarketSource {
    fn from(s: &str) -> Self {
        MarketSource::from(s.to_string())
    }
}

impl From<MarketSource> for String {
    fn from(source: MarketSource) -> Self {
        match source {
            MarketSource::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MarketSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single piece of price evidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDataPoint {
    pub source: MarketSource,
    pub value: f64,
    pub date: DateTime<Utc>,
    pub sample_size: u32,
    pub condition: CardCondition,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Set by the producer of synthetic data
    #[serde(default)]
    pub is_synthetic: bool,
}

impl MarketDataPoint {
    pub fn new(
        source: impl Into<MarketSource>,
        value: f64,
        date: DateTime<Utc>,
        sample_size: u32,
        condition: CardCondition,
    ) -> Self {
        Self {
            source: source.into(),
            value,
            date,
            sample_size,
            condition,
            url: None,
            notes: None,
            is_synthetic: false,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Whether this point looks like a real sold comp rather than synthetic data
    pub fn is_real_sold_comp(&self, marker: &str) -> bool {
        self.source == MarketSource::EbaySold
            && !self.is_synthetic
            && self.url.as_deref().is_some_and(|url| !url.contains(marker))
    }
}

/// Discrete confidence band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceLevel {
    /// Map a 0-100 score to a level; lower bounds are inclusive
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            ConfidenceLevel::VeryHigh
        } else if score >= 75.0 {
            ConfidenceLevel::High
        } else if score >= 60.0 {
            ConfidenceLevel::Medium
        } else if score >= 40.0 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::VeryHigh => "very_high",
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::VeryLow => "very_low",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-factor confidence breakdown, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyFactors {
    pub source_diversity: f64,
    pub sample_size: f64,
    pub data_recency: f64,
    pub value_consistency: f64,
    pub card_specificity: f64,
}

/// Named value adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MultiplierFactor {
    Grade,
    Condition,
    Rookie,
    Autograph,
    Scarcity,
    Parallel,
    Era,
    SportMarket,
}

impl MultiplierFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiplierFactor::Grade => "grade",
            MultiplierFactor::Condition => "condition",
            MultiplierFactor::Rookie => "rookie",
            MultiplierFactor::Autograph => "autograph",
            MultiplierFactor::Scarcity => "scarcity",
            MultiplierFactor::Parallel => "parallel",
            MultiplierFactor::Era => "era",
            MultiplierFactor::SportMarket => "sport_market",
        }
    }
}

/// Recorded when the compound multiplier hit the cap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapApplied {
    pub cap: f64,
    /// Raw product, rounded to 2 dp
    pub uncapped: f64,
}

/// What the multiplier stage did to the base value
#[derive(Debug, Clone, PartialEq)]
pub enum MultiplierBreakdown {
    Applied {
        /// Non-neutral factors in evaluation order
        factors: Vec<(MultiplierFactor, f64)>,
        /// Capped compound multiplier, rounded to 2 dp
        total: f64,
        cap: Option<CapApplied>,
    },
    Skipped {
        note: String,
    },
}

impl MultiplierBreakdown {
    pub fn factor(&self, factor: MultiplierFactor) -> Option<f64> {
        match self {
            MultiplierBreakdown::Applied { factors, .. } => {
                factors.iter().find(|(f, _)| *f == factor).map(|(_, m)| *m)
            }
            MultiplierBreakdown::Skipped { .. } => None,
        }
    }

    pub fn total(&self) -> Option<f64> {
        match self {
            MultiplierBreakdown::Applied { total, .. } => Some(*total),
            MultiplierBreakdown::Skipped { .. } => None,
        }
    }

    pub fn cap(&self) -> Option<CapApplied> {
        match self {
            MultiplierBreakdown::Applied { cap, .. } => *cap,
            MultiplierBreakdown::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, MultiplierBreakdown::Skipped { .. })
    }
}

impl Serialize for MultiplierBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MultiplierBreakdown::Applied { factors, total, cap } => {
                let extra = if cap.is_some() { 3 } else { 1 };
                let mut map = serializer.serialize_map(Some(factors.len() + extra))?;
                for (factor, mult) in factors {
                    map.serialize_entry(factor.as_str(), mult)?;
                }
                if let Some(cap) = cap {
                    map.serialize_entry("_cap_applied", &cap.cap)?;
                    map.serialize_entry("_uncapped", &cap.uncapped)?;
                }
                map.serialize_entry("_total", total)?;
                map.end()
            }
            MultiplierBreakdown::Skipped { note } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("note", note)?;
                map.end()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

/// Pace of price movement; only the normal pace is measured today
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendVelocity {
    #[default]
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Volatility {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendRecommendation {
    #[serde(rename = "hold")]
    Hold,
    #[serde(rename = "sell high")]
    SellHigh,
    #[serde(rename = "buy low")]
    BuyLow,
}

/// Trend narrative derived from dated data points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketTrend {
    pub direction: TrendDirection,
    pub velocity: TrendVelocity,
    /// Half of the full-span change; not a literal 30-day window
    #[serde(rename = "30_day_change")]
    pub change_30_day: f64,
    #[serde(rename = "90_day_change")]
    pub change_90_day: f64,
    pub volatility: Volatility,
    pub recommendation: TrendRecommendation,
}

impl Default for MarketTrend {
    fn default() -> Self {
        Self {
            direction: TrendDirection::Stable,
            velocity: TrendVelocity::Normal,
            change_30_day: 0.0,
            change_90_day: 0.0,
            volatility: Volatility::Low,
            recommendation: TrendRecommendation::Hold,
        }
    }
}

/// Final output of a valuation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueEstimate {
    pub estimated_value: f64,
    pub confidence: ConfidenceLevel,
    pub confidence_score: f64,
    /// (low, high); always brackets `estimated_value`
    pub value_range: (f64, f64),
    pub data_points: Vec<MarketDataPoint>,
    pub market_trends: MarketTrend,
    pub grading_recommendation: Option<String>,
    pub accuracy_factors: AccuracyFactors,
    pub multipliers_applied: MultiplierBreakdown,
    pub timestamp: DateTime<Utc>,
}

/// Source entry in the wire response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub value: f64,
    pub date: String,
}

/// JSON shape handed to callers of the estimate endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimateResponse {
    pub estimated_value: f64,
    pub confidence: ConfidenceLevel,
    pub confidence_score: f64,
    pub range: [f64; 2],
    pub multipliers: MultiplierBreakdown,
    pub grading_rec: Option<String>,
    pub trend: MarketTrend,
    pub sources: Vec<SourceSummary>,
}

/// Number of data points echoed back in a response
pub const RESPONSE_SOURCE_LIMIT: usize = 6;

impl ValueEstimate {
    pub fn to_response(&self) -> EstimateResponse {
        EstimateResponse {
            estimated_value: self.estimated_value,
            confidence: self.confidence,
            confidence_score: self.confidence_score,
            range: [self.value_range.0, self.value_range.1],
            multipliers: self.multipliers_applied.clone(),
            grading_rec: self.grading_recommendation.clone(),
            trend: self.market_trends.clone(),
            sources: self
                .data_points
                .iter()
                .take(RESPONSE_SOURCE_LIMIT)
                .map(|dp| SourceSummary {
                    source: dp.source.to_string(),
                    value: dp.value,
                    date: dp.date.to_rfc3339(),
                })
                .collect(),
        }
    }
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_enum_parsing_is_lenient() {
        assert_eq!("Basketball".parse::<Sport>().unwrap(), Sport::Basketball);
        assert_eq!("curling".parse::<Sport>().unwrap(), Sport::Other);
        assert_eq!("nm_plus".parse::<CardCondition>().unwrap(), CardCondition::NearMintPlus);
        assert_eq!("Near Mint Plus".parse::<CardCondition>().unwrap(), CardCondition::NearMintPlus);
        assert_eq!("Gem Mint".parse::<CardCondition>().unwrap(), CardCondition::GemMint);
        assert_eq!("scuffed".parse::<CardCondition>().unwrap(), CardCondition::Raw);
    }

    #[test]
    fn test_market_source_wire_names() {
        assert_eq!(MarketSource::from("130point"), MarketSource::OneThirtyPoint);
        assert_eq!(MarketSource::from("myslabs"), MarketSource::Other("myslabs".into()));
        assert_eq!(String::from(MarketSource::PsaApr), "psa_apr");

        let json = serde_json::to_string(&MarketSource::EbaySold).unwrap();
        assert_eq!(json, "\"ebay_sold\"");
        let parsed: MarketSource = serde_json::from_str("\"sportlots\"").unwrap();
        assert_eq!(parsed, MarketSource::Sportlots);
        assert_eq!(MarketSource::Other("x".into()).trust_weight(), 0.05);
    }

    #[test]
    fn test_confidence_level_boundaries_inclusive() {
        assert_eq!(ConfidenceLevel::from_score(85.0), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_score(84.99), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(75.0), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(60.0), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(40.0), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(39.9), ConfidenceLevel::VeryLow);
    }

    #[test]
    fn test_real_sold_comp_detection() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let base = MarketDataPoint::new("ebay_sold", 10.0, date, 1, CardCondition::Raw);

        assert!(!base.is_real_sold_comp("mock"));
        assert!(base.clone().with_url("https://ebay.com/itm/123").is_real_sold_comp("mock"));
        assert!(!base.clone().with_url("https://ebay.com/itm/mock_1").is_real_sold_comp("mock"));

        let mut flagged = base.clone().with_url("https://ebay.com/itm/123");
        flagged.is_synthetic = true;
        assert!(!flagged.is_real_sold_comp("mock"));

        let comc = MarketDataPoint::new("comc", 10.0, date, 1, CardCondition::Raw)
            .with_url("https://comc.com/item/1");
        assert!(!comc.is_real_sold_comp("mock"));
    }

    #[test]
    fn test_breakdown_serializes_flat() {
        let applied = MultiplierBreakdown::Applied {
            factors: vec![(MultiplierFactor::Condition, 1.5), (MultiplierFactor::Era, 1.0)],
            total: 25.0,
            cap: Some(CapApplied { cap: 25.0, uncapped: 55.44 }),
        };
        let value = serde_json::to_value(&applied).unwrap();
        assert_eq!(value["condition"], 1.5);
        assert_eq!(value["era"], 1.0);
        assert_eq!(value["_total"], 25.0);
        assert_eq!(value["_cap_applied"], 25.0);
        assert_eq!(value["_uncapped"], 55.44);

        let skipped = MultiplierBreakdown::Skipped { note: "skipped".into() };
        let value = serde_json::to_value(&skipped).unwrap();
        assert_eq!(value, serde_json::json!({ "note": "skipped" }));
    }

    #[test]
    fn test_trend_serializes_wire_keys() {
        let value = serde_json::to_value(MarketTrend::default()).unwrap();
        assert_eq!(value["direction"], "stable");
        assert_eq!(value["velocity"], "normal");
        assert_eq!(value["30_day_change"], 0.0);
        assert_eq!(value["90_day_change"], 0.0);
        assert_eq!(value["volatility"], "low");
        assert_eq!(value["recommendation"], "hold");

        let parsed: MarketTrend = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.velocity, TrendVelocity::Normal);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.345_678, 2), 12.35);
        assert_eq!(round_to(-3.14159, 1), -3.1);
        assert_eq!(round_to(7.0, 2), 7.0);
    }
}
