//! Error types for the card valuation engine

use thiserror::Error;

/// Result type for valuation operations
pub type Result<T> = std::result::Result<T, ValuationError>;

/// Errors that can occur while valuing a card
#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("No market data provided and mock data disabled")]
    NoMarketData,

    #[error("Invalid card year: {0:?}")]
    InvalidYear(String),

    #[error("Invalid actual sale price: {0}")]
    InvalidPrice(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<toml::ser::Error> for ValuationError {
    fn from(err: toml::ser::Error) -> Self {
        ValuationError::Config(err.to_string())
    }
}
