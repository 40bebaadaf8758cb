//! Grant quota commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use microbadge_core::config::AppConfig;
use microbadge_core::error::AppError;
use microbadge_core::types::UserId;
use microbadge_entity::quota::QuotaScope;
use microbadge_service::QuotaCheck;

/// Arguments for quota commands
#[derive(Debug, Args)]
pub struct QuotaArgs {
    /// Quota subcommand
    #[command(subcommand)]
    pub command: QuotaCommand,
}

/// Quota subcommands
#[derive(Debug, Subcommand)]
pub enum QuotaCommand {
    /// Check whether a granter may grant one more badge
    Check {
        /// Granter user ID
        granter: String,
        /// Badge category
        category: String,
        /// Restrict to an organization scope
        #[arg(long, conflicts_with = "tag")]
        org: Option<String>,
        /// Restrict to a tag scope
        #[arg(long)]
        tag: Option<String>,
        /// Consume one unit when allowed
        #[arg(long)]
        consume: bool,
    },
    /// Show every active quota owned by a user
    Summary {
        /// Owner user ID
        user: String,
    },
}

/// Quota summary display row
#[derive(Debug, Serialize, Tabled)]
struct QuotaRow {
    /// Quota ID
    id: String,
    /// Scope
    scope: String,
    /// Category
    category: String,
    /// Period
    period: String,
    /// Used
    used: i64,
    /// Remaining
    remaining: i64,
    /// Maximum
    max: i32,
}

/// Execute quota commands
pub async fn execute(
    args: &QuotaArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let engine = super::connect_engine(config).await?;

    match &args.command {
        QuotaCommand::Check {
            granter,
            category,
            org,
            tag,
            consume,
        } => {
            let scope = org
                .as_deref()
                .map(QuotaScope::organization)
                .or_else(|| tag.as_deref().map(QuotaScope::tag));
            let granter = UserId::from(granter.as_str());
            let check = if *consume {
                engine
                    .check_and_consume_quota(&granter, category, scope.as_ref())
                    .await?
            } else {
                engine
                    .check_quota(&granter, category, scope.as_ref())
                    .await?
            };
            print_check(&check, format);
        }
        QuotaCommand::Summary { user } => {
            let items = engine
                .user_quota_summary(&UserId::from(user.as_str()))
                .await?;
            if format == OutputFormat::Json {
                output::print_json(&items);
                return Ok(());
            }
            let rows: Vec<QuotaRow> = items
                .iter()
                .map(|item| QuotaRow {
                    id: item.quota.id.to_string(),
                    scope: format!("{} {}", item.quota.scope_type, item.scope_name),
                    category: item
                        .quota
                        .badge_category
                        .clone()
                        .unwrap_or_else(|| "*".to_string()),
                    period: format!("{} ({})", item.period_label, item.period_key),
                    used: item.used_count,
                    remaining: item.remaining_count,
                    max: item.quota.max_grants,
                })
                .collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}

fn print_check(check: &QuotaCheck, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_json(check);
        return;
    }
    if check.allowed {
        output::print_success(&check.message);
    } else {
        output::print_warning(&check.message);
    }
    if let Some(quota) = &check.quota {
        output::print_kv("Quota", quota.id.as_str());
        output::print_kv("Remaining", &check.remaining.to_string());
    }
    if let Some(key) = &check.period_key {
        output::print_kv("Period", key);
    }
}
