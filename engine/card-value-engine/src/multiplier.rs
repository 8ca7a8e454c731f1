use crate::config::{ValuationParameters, DEFAULT_MULTIPLIER_CAP};
use crate::models::*;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static SERIAL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)/(\d+)").expect("serial pattern is valid"));

/// Grade ranges (inclusive) for graded cards
const GRADE_RANGES: [(f64, f64, f64); 4] =
    [(9.5, 10.0, 3.0), (9.0, 9.49, 2.0), (8.0, 8.99, 1.5), (7.0, 7.99, 1.2)];

/// Multiplier for any grade outside `GRADE_RANGES`
const LOW_GRADE_MULTIPLIER: f64 = 0.8;

/// (max print run, multiplier), scanned in order
const SCARCITY_TABLE: [(u64, f64); 9] = [
    (1, 50.0),
    (5, 10.0),
    (10, 5.0),
    (25, 3.5),
    (50, 2.5),
    (99, 2.0),
    (199, 1.5),
    (499, 1.3),
    (999, 1.1),
];

/// Serial numbers matching a popular jersey number
const LUCKY_NUMBERS: [u64; 14] = [8, 3, 7, 9, 10, 12, 15, 23, 24, 30, 32, 33, 34, 45];

/// Parallel keywords in priority order; the first substring match wins
const PARALLEL_PRIORITY: [(&str, f64); 17] = [
    ("superfractor", 50.0),
    ("1/1", 50.0),
    ("gold", 8.0),
    ("orange", 5.0),
    ("black", 4.0),
    ("red", 3.0),
    ("blue", 2.5),
    ("purple", 2.0),
    ("green", 1.8),
    ("cracked ice", 1.8),
    ("shimmer", 1.7),
    ("xfractor", 1.6),
    ("mojo", 1.6),
    ("silver", 1.5),
    ("holo", 1.4),
    ("prizm", 1.3),
    ("refractor", 1.3),
];

/// Named parallel that matches none of the priority keywords
const GENERIC_PARALLEL_MULTIPLIER: f64 = 1.2;

const ROOKIE_MULTIPLIER: f64 = 1.5;
const AUTOGRAPH_MULTIPLIER: f64 = 2.5;

/// Production era of a card, by year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Era {
    Vintage,
    JunkWax,
    Modern,
    UltraModern,
}

impl Era {
    pub fn from_year(year: i32) -> Self {
        if year < 1980 {
            Era::Vintage
        } else if (1986..=1994).contains(&year) {
            Era::JunkWax
        } else if (1995..=2015).contains(&year) {
            Era::Modern
        } else {
            Era::UltraModern
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Era::Vintage => 2.5,
            Era::JunkWax => 0.3,
            Era::Modern => 1.0,
            Era::UltraModern => 1.2,
        }
    }
}

/// Computes the capped compound value multiplier for a card
#[derive(Debug, Clone)]
pub struct MultiplierEngine {
    cap: f64,
}

impl Default for MultiplierEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MULTIPLIER_CAP)
    }
}

impl MultiplierEngine {
    /// Create an engine with the given compound cap
    pub fn new(cap: f64) -> Self {
        Self { cap }
    }

    pub fn from_parameters(params: &ValuationParameters) -> Self {
        Self::new(params.multiplier_cap)
    }

    pub fn cap(&self) -> f64 {
        self.cap
    }

    /// Apply every multiplier to `base_value`.
    ///
    /// Returns the adjusted value rounded to cents and the breakdown of the
    /// factors that moved it. The product of all factors is capped.
    pub fn apply_all(&self, base_value: f64, card: &CardAttributes) -> (f64, MultiplierBreakdown) {
        let mut factors = Vec::with_capacity(7);

        let grade_mult = match (card.graded, card.grade_value) {
            (true, Some(grade)) => {
                let mult = Self::grade_multiplier(grade);
                factors.push((MultiplierFactor::Grade, mult));
                mult
            }
            _ => {
                let mult = Self::condition_multiplier(card.condition);
                factors.push((MultiplierFactor::Condition, mult));
                mult
            }
        };

        let rookie_mult = if card.rookie { ROOKIE_MULTIPLIER } else { 1.0 };
        if card.rookie {
            factors.push((MultiplierFactor::Rookie, rookie_mult));
        }

        let auto_mult = if card.autograph { AUTOGRAPH_MULTIPLIER } else { 1.0 };
        if card.autograph {
            factors.push((MultiplierFactor::Autograph, auto_mult));
        }

        let scarcity_mult = Self::scarcity_multiplier(card.serial());
        if scarcity_mult != 1.0 {
            factors.push((MultiplierFactor::Scarcity, scarcity_mult));
        }

        let parallel_mult = Self::parallel_multiplier(card.parallel_name());
        if parallel_mult != 1.0 {
            factors.push((MultiplierFactor::Parallel, parallel_mult));
        }

        let era_mult = Era::from_year(card.year).multiplier();
        factors.push((MultiplierFactor::Era, era_mult));

        let sport_mult = Self::sport_multiplier(card.sport);
        if sport_mult != 1.0 {
            factors.push((MultiplierFactor::SportMarket, sport_mult));
        }

        let raw_compound = grade_mult
            * rookie_mult
            * auto_mult
            * scarcity_mult
            * parallel_mult
            * era_mult
            * sport_mult;
        let capped = raw_compound.min(self.cap);

        let cap = if capped < raw_compound {
            warn!(
                "Compound multiplier {:.2} for {} capped at {:.2}",
                raw_compound, card.player, self.cap
            );
            Some(CapApplied { cap: self.cap, uncapped: round_to(raw_compound, 2) })
        } else {
            None
        };

        debug!("Multipliers for {}: {:?} (compound {:.4})", card.player, factors, capped);

        let adjusted = round_to(base_value * capped, 2);
        (adjusted, MultiplierBreakdown::Applied { factors, total: round_to(capped, 2), cap })
    }

    /// Multiplier for a numeric grade
    pub fn grade_multiplier(grade: f64) -> f64 {
        GRADE_RANGES
            .iter()
            .find(|(low, high, _)| *low <= grade && grade <= *high)
            .map(|(_, _, mult)| *mult)
            .unwrap_or(LOW_GRADE_MULTIPLIER)
    }

    /// Multiplier for an ungraded condition
    pub fn condition_multiplier(condition: CardCondition) -> f64 {
        match condition {
            CardCondition::GemMint => 3.5,
            CardCondition::Mint => 2.0,
            CardCondition::NearMintPlus => 1.5,
            CardCondition::NearMint => 1.2,
            CardCondition::Excellent => 0.8,
            CardCondition::VeryGood => 0.6,
            CardCondition::Good => 0.4,
            CardCondition::Raw => 1.0,
        }
    }

    /// Scarcity from a `current/total` serial; unparseable serials are neutral
    pub fn scarcity_multiplier(serial: Option<&str>) -> f64 {
        let Some((current, total)) = serial.and_then(parse_serial) else {
            if let Some(serial) = serial {
                debug!("Ignoring unparseable serial number {:?}", serial);
            }
            return 1.0;
        };

        let mut mult = SCARCITY_TABLE
            .iter()
            .find(|(max_run, _)| total <= *max_run)
            .map(|(_, mult)| *mult)
            .unwrap_or(1.0);

        if LUCKY_NUMBERS.contains(&current) && current <= total {
            mult *= 1.2;
        }

        if current == 1 {
            mult *= 1.3;
        } else if current == total {
            mult *= 1.1;
        }

        mult
    }

    /// Parallel premium from an ordered keyword scan
    pub fn parallel_multiplier(parallel: Option<&str>) -> f64 {
        let Some(parallel) = parallel.filter(|p| !p.is_empty()) else {
            return 1.0;
        };

        let lowered = parallel.to_lowercase();
        PARALLEL_PRIORITY
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, mult)| *mult)
            .unwrap_or(GENERIC_PARALLEL_MULTIPLIER)
    }

    /// Relative market strength of each sport
    pub fn sport_multiplier(sport: Sport) -> f64 {
        match sport {
            Sport::Basketball => 1.15,
            Sport::Football => 1.10,
            Sport::Baseball => 0.95,
            Sport::Soccer => 1.20,
            Sport::Hockey => 0.90,
            Sport::Other => 1.00,
        }
    }
}

/// Parse the first `current/total` pair out of a serial number
pub fn parse_serial(serial: &str) -> Option<(u64, u64)> {
    let caps = SERIAL_PATTERN.captures(serial)?;
    let current = caps.get(1)?.as_str().parse().ok()?;
    let total = caps.get(2)?.as_str().parse().ok()?;
    Some((current, total))
}
