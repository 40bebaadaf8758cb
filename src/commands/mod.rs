//! CLI command definitions and dispatch.

pub mod badge;
pub mod event;
pub mod migrate;
pub mod points;
pub mod quota;
pub mod rule;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use microbadge_core::config::AppConfig;
use microbadge_core::error::AppError;
use microbadge_core::traits::SystemClock;
use microbadge_database::{DatabasePool, Stores};
use microbadge_service::BadgeEngine;

/// MicroBadge — badge grant engine administration
#[derive(Debug, Parser)]
#[command(name = "microbadge", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// Event intake
    Event(event::EventArgs),
    /// Badge grants
    Badge(badge::BadgeArgs),
    /// Grant quotas
    Quota(quota::QuotaArgs),
    /// Point balances
    Points(points::PointsArgs),
    /// Rule evaluation
    Rule(rule::RuleArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, config).await,
            Commands::Event(args) => event::execute(args, config, self.format).await,
            Commands::Badge(args) => badge::execute(args, config, self.format).await,
            Commands::Quota(args) => quota::execute(args, config, self.format).await,
            Commands::Points(args) => points::execute(args, config, self.format).await,
            Commands::Rule(args) => rule::execute(args, config, self.format).await,
        }
    }
}

/// Helper: create database pool from config
pub async fn create_db_pool(config: &AppConfig) -> Result<DatabasePool, AppError> {
    DatabasePool::connect(&config.database).await
}

/// Helper: build the engine over PostgreSQL with the system clock
pub async fn connect_engine(config: &AppConfig) -> Result<BadgeEngine, AppError> {
    let pool = create_db_pool(config).await?;
    Ok(BadgeEngine::new(
        Stores::postgres(pool.into_pool()),
        Arc::new(SystemClock),
        &config.engine,
    ))
}

/// Helper: parse a JSON object argument
pub fn parse_json_object<T: serde::de::DeserializeOwned>(
    raw: &str,
    what: &str,
) -> Result<T, AppError> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("Invalid {} JSON: {}", what, e)))
}
