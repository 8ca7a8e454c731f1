use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use card_value_engine::{
    cli::{Cli, CliHandler},
    logging::initialize_logging,
    CardValueEstimator, EngineConfig, VERSION,
};

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = EngineConfig::from_file(path).with_context(|| {
                format!("Failed to load configuration from {}", path.display())
            })?;
            config.apply_env();
            config
        }
        None => EngineConfig::from_env().context("Failed to load configuration from environment")?,
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.logging.format = format.clone();
    }
    config.validate().context("Invalid configuration")?;

    initialize_logging(&config.logging)?;
    info!("Card Value Engine v{}", VERSION);

    let handler = CliHandler::new(CardValueEstimator::new(&config));
    match handler.handle_command(cli.command) {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}
