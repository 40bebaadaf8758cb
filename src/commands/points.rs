//! Point balance commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use microbadge_core::config::AppConfig;
use microbadge_core::error::AppError;
use microbadge_core::types::UserId;

/// Arguments for points commands
#[derive(Debug, Args)]
pub struct PointsArgs {
    /// Points subcommand
    #[command(subcommand)]
    pub command: PointsCommand,
}

/// Points subcommands
#[derive(Debug, Subcommand)]
pub enum PointsCommand {
    /// Show a user's balance and recent transactions
    Show {
        /// User ID
        user: String,
    },
}

/// Point transaction display row
#[derive(Debug, Serialize, Tabled)]
struct TransactionRow {
    /// When
    created_at: String,
    /// Amount
    amount: i64,
    /// Reference
    reference: String,
    /// Description
    description: String,
}

/// Execute points commands
pub async fn execute(
    args: &PointsArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let engine = super::connect_engine(config).await?;

    match &args.command {
        PointsCommand::Show { user } => {
            let summary = engine.points_summary(&UserId::from(user.as_str())).await?;
            if format == OutputFormat::Json {
                output::print_json(&summary);
                return Ok(());
            }
            output::print_kv("User", summary.user_id.as_str());
            output::print_kv("Total points", &summary.total_points.to_string());
            let rows: Vec<TransactionRow> = summary
                .recent
                .iter()
                .map(|t| TransactionRow {
                    created_at: t.created_at.format("%Y-%m-%d %H:%M").to_string(),
                    amount: t.amount,
                    reference: format!("{}:{}", t.reference_type, t.reference_id),
                    description: t.description.clone().unwrap_or_default(),
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
