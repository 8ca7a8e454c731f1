//! Loosely typed card records as produced by the identification step, and
//! their conversion into `CardAttributes`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, ValuationError};
use crate::models::{CardAttributes, CardCondition, Sport};

/// Year as sent by upstream: a number or free text such as "2017-18"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YearField {
    Number(i64),
    Text(String),
}

/// Boolean flag as stored upstream: a JSON bool, a 0/1 column or text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FlagValue {
    fn is_set(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Int(n) => *n != 0,
            FlagValue::Float(f) => *f != 0.0,
            FlagValue::Text(text) => {
                !matches!(text.trim().to_lowercase().as_str(), "" | "0" | "false" | "no")
            }
        }
    }
}

fn lenient_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<FlagValue>::deserialize(deserializer)?.is_some_and(|flag| flag.is_set()))
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Card record from the identification step or a stored row.
///
/// Upstream producers disagree on field names, so both spellings are kept
/// and merged in `into_attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    #[serde(default)]
    pub player: Option<String>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub year: Option<YearField>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub set_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub card_number: String,
    #[serde(default)]
    pub sport: Option<String>,
    #[serde(default)]
    pub parallel: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub numbering: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub autograph: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_auto: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub rookie: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub is_rookie: bool,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub insert: bool,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub graded: bool,
    #[serde(default)]
    pub grade_value: Option<f64>,
    #[serde(default)]
    pub grading_company: Option<String>,
}

impl CardRecord {
    /// Normalise into engine attributes; fails only on a missing or non-numeric year
    pub fn into_attributes(self) -> Result<CardAttributes> {
        let year = match &self.year {
            Some(year) => parse_year(year)?,
            None => return Err(ValuationError::InvalidYear(String::new())),
        };

        let sport = self.sport.as_deref().unwrap_or("other").parse::<Sport>().unwrap_or_default();
        let condition =
            self.condition.as_deref().unwrap_or("raw").parse::<CardCondition>().unwrap_or_default();

        let parallel = self
            .parallel
            .filter(|p| !p.trim().is_empty() && !p.trim().eq_ignore_ascii_case("base"));

        Ok(CardAttributes {
            player: first_non_blank(self.player, self.player_name).unwrap_or_default(),
            year,
            set_name: self.set_name,
            card_number: self.card_number,
            sport,
            parallel,
            serial_number: first_non_blank(self.serial_number, self.numbering),
            autograph: self.autograph || self.is_auto,
            rookie: self.rookie || self.is_rookie,
            insert: self.insert,
            condition,
            graded: self.graded,
            grade_value: self.grade_value,
            grading_company: self.grading_company,
        })
    }
}

/// `primary` unless it is absent or blank, then `fallback` on the same terms
fn first_non_blank(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary.filter(|s| !s.trim().is_empty()).or(fallback.filter(|s| !s.trim().is_empty()))
}

impl TryFrom<CardRecord> for CardAttributes {
    type Error = ValuationError;

    fn try_from(record: CardRecord) -> Result<Self> {
        record.into_attributes()
    }
}

/// Leading four-digit year ("2017-18" -> 2017)
pub fn parse_year(year: &YearField) -> Result<i32> {
    match year {
        YearField::Number(n) => {
            i32::try_from(*n).map_err(|_| ValuationError::InvalidYear(n.to_string()))
        }
        YearField::Text(text) => {
            let trimmed = text.trim();
            let prefix = trimmed.get(..4).unwrap_or(trimmed);
            if prefix.len() == 4 && prefix.chars().all(|c| c.is_ascii_digit()) {
                prefix.parse().map_err(|_| ValuationError::InvalidYear(text.clone()))
            } else {
                Err(ValuationError::InvalidYear(text.clone()))
            }
        }
    }
}
