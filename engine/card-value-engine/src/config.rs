use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, ValuationError};

/// Default compound multiplier cap
pub const DEFAULT_MULTIPLIER_CAP: f64 = 25.0;

/// Default window (days) for a data point to count as recent
pub const DEFAULT_RECENCY_WINDOW_DAYS: i64 = 30;

/// URL substring carried by every synthetic data point
pub const DEFAULT_SYNTHETIC_URL_MARKER: &str = "mock";

/// Configuration for the card valuation engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Valuation parameters
    pub valuation: ValuationParameters,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationParameters {
    /// Upper bound on the compound multiplier (e.g., 25.0 = 25x base)
    pub multiplier_cap: f64,

    /// Data points newer than this many days count towards recency
    pub recency_window_days: i64,

    /// Fall back to synthetic market data when none is supplied
    pub use_mock_by_default: bool,

    /// URL substring identifying synthetic data points
    pub synthetic_url_marker: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for ValuationParameters {
    fn default() -> Self {
        Self {
            multiplier_cap: DEFAULT_MULTIPLIER_CAP,
            recency_window_days: DEFAULT_RECENCY_WINDOW_DAYS,
            use_mock_by_default: true,
            synthetic_url_marker: DEFAULT_SYNTHETIC_URL_MARKER.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override fields from `CARD_VALUE_*` environment variables
    pub fn apply_env(&mut self) {
        if let Ok(cap) = std::env::var("CARD_VALUE_MULTIPLIER_CAP") {
            self.valuation.multiplier_cap = cap.parse().unwrap_or(DEFAULT_MULTIPLIER_CAP);
        }

        if let Ok(days) = std::env::var("CARD_VALUE_RECENCY_DAYS") {
            self.valuation.recency_window_days =
                days.parse().unwrap_or(DEFAULT_RECENCY_WINDOW_DAYS);
        }

        if let Ok(use_mock) = std::env::var("CARD_VALUE_USE_MOCK") {
            self.valuation.use_mock_by_default = use_mock.parse().unwrap_or(true);
        }

        if let Ok(level) = std::env::var("CARD_VALUE_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(format) = std::env::var("CARD_VALUE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.valuation.multiplier_cap > 1.0) {
            return Err(ValuationError::Config(format!(
                "multiplier_cap must be greater than 1.0, got {}",
                self.valuation.multiplier_cap
            )));
        }

        if self.valuation.recency_window_days <= 0 {
            return Err(ValuationError::Config(format!(
                "recency_window_days must be positive, got {}",
                self.valuation.recency_window_days
            )));
        }

        if self.valuation.synthetic_url_marker.is_empty() {
            return Err(ValuationError::Config("synthetic_url_marker must not be empty".into()));
        }

        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ValuationError::Config(format!("Invalid log level: {other}"))),
        }

        match self.logging.format.as_str() {
            "json" | "pretty" | "compact" => {}
            other => return Err(ValuationError::Config(format!("Invalid log format: {other}"))),
        }

        Ok(())
    }
}
