//! CLI module for the heart risk service
//!
//! Subcommands:
//! - `serve`: HTTP service
//! - `train`: fit and save a model from CSV files
//! - `predict`: score a CSV file offline
//! - `generate`: write or extend a synthetic dataset

pub mod generate;
pub mod predict;
pub mod serve;
pub mod train;

use clap::{Parser, Subcommand};

use crate::config::{AppConfig, LogFormat};
use crate::infrastructure::logging;

/// Heart disease risk scoring, training and data tools
#[derive(Parser)]
#[command(name = "heart-risk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP service
    Serve,

    /// Train a model from one or more CSV files
    Train(train::TrainArgs),

    /// Score a CSV file with the saved model
    Predict(predict::PredictArgs),

    /// Generate synthetic records
    Generate(generate::GenerateArgs),
}

/// Configuration and compact stderr logging for the offline subcommands
pub(crate) fn offline_config() -> AppConfig {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load().unwrap_or_default();
    config.logging.format = LogFormat::Compact;
    logging::init_logging(&config.logging);
    config
}
