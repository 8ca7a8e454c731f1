//! # Command Line Interface
//!
//! Estimate card values, inspect synthetic market data and backtest
//! estimates against realised sales from JSON files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::estimator::CardValueEstimator;
use crate::models::MarketDataPoint;
use crate::record::CardRecord;
use crate::validator::{AccuracyReport, AccuracyValidator, ValidationRecord};

/// Trading card valuation CLI
#[derive(Parser, Debug)]
#[command(name = "card-value")]
#[command(about = "Estimate trading card values from attributes and sales evidence")]
pub struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format override (json, pretty, compact)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Estimate the value of one card
    Estimate {
        /// Card record (JSON)
        #[arg(long)]
        card: PathBuf,
        /// Market data points (JSON array)
        #[arg(long)]
        market_data: Option<PathBuf>,
        /// Fail instead of generating synthetic data when no market data is given
        #[arg(long)]
        no_mock: bool,
    },
    /// Print the synthetic market data generated for a card
    Mock {
        /// Card record (JSON)
        #[arg(long)]
        card: PathBuf,
    },
    /// Estimate a batch of cards and compare against their actual sale prices
    Backtest {
        /// Backtest cases (JSON array of {card, market_data?, actual_price})
        #[arg(long)]
        cases: PathBuf,
    },
}

/// One backtest input
#[derive(Debug, Clone, Deserialize)]
pub struct BacktestCase {
    pub card: CardRecord,
    #[serde(default)]
    pub market_data: Option<Vec<MarketDataPoint>>,
    pub actual_price: f64,
}

/// Backtest output
#[derive(Debug, Clone, Serialize)]
pub struct BacktestOutput {
    pub results: Vec<ValidationRecord>,
    pub report: AccuracyReport,
}

/// CLI handler
pub struct CliHandler {
    estimator: CardValueEstimator,
}

impl CliHandler {
    pub fn new(estimator: CardValueEstimator) -> Self {
        Self { estimator }
    }

    /// Run a command and return its JSON output
    pub fn handle_command(&self, command: Commands) -> Result<serde_json::Value> {
        match command {
            Commands::Estimate { card, market_data, no_mock } => {
                self.estimate(&card, market_data.as_deref(), !no_mock)
            }
            Commands::Mock { card } => self.mock(&card),
            Commands::Backtest { cases } => self.backtest(&cases),
        }
    }

    fn estimate(
        &self,
        card_path: &Path,
        market_data_path: Option<&Path>,
        use_mock: bool,
    ) -> Result<serde_json::Value> {
        let card = read_json::<CardRecord>(card_path)?.into_attributes()?;
        let market_data = market_data_path.map(read_json::<Vec<MarketDataPoint>>).transpose()?;

        let estimate = self
            .estimator
            .estimate_value(&card, market_data, use_mock && self.estimator.use_mock_by_default())
            .context("Failed to estimate card value")?;

        Ok(serde_json::to_value(estimate.to_response())?)
    }

    fn mock(&self, card_path: &Path) -> Result<serde_json::Value> {
        let card = read_json::<CardRecord>(card_path)?.into_attributes()?;
        let points = self.estimator.mock_factory().generate(&card);
        Ok(serde_json::to_value(points)?)
    }

    fn backtest(&self, cases_path: &Path) -> Result<serde_json::Value> {
        let cases = read_json::<Vec<BacktestCase>>(cases_path)?;
        let mut validator = AccuracyValidator::new();

        for (index, case) in cases.into_iter().enumerate() {
            let card = case
                .card
                .into_attributes()
                .with_context(|| format!("Invalid card in backtest case {index}"))?;
            let estimate = self
                .estimator
                .estimate_value(&card, case.market_data, self.estimator.use_mock_by_default())
                .with_context(|| format!("Failed to estimate backtest case {index}"))?;
            validator
                .validate_strict(&estimate, case.actual_price)
                .with_context(|| format!("Invalid sale price in backtest case {index}"))?;
        }

        let output =
            BacktestOutput { results: validator.history().to_vec(), report: validator.report() };
        Ok(serde_json::to_value(output)?)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}
