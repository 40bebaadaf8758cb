//! Badge grant, revocation and expiry commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use crate::output::{self, OutputFormat};
use microbadge_core::config::AppConfig;
use microbadge_core::error::AppError;
use microbadge_core::types::{GrantId, OrgId, TagId, UserId};
use microbadge_database::repositories::AuditLogRepository;
use microbadge_entity::audit::USER_BADGE_ENTITY;
use microbadge_entity::grant::{Grant, GrantRequest};
use microbadge_service::{BatchGrantRequest, BatchReport, Selection, UserGrantStatus};

/// Arguments for badge commands
#[derive(Debug, Args)]
pub struct BadgeArgs {
    /// Badge subcommand
    #[command(subcommand)]
    pub command: BadgeCommand,
}

/// Badge subcommands
#[derive(Debug, Subcommand)]
pub enum BadgeCommand {
    /// Grant a badge to one user
    Grant {
        /// Recipient user ID
        user: String,
        /// Badge ID
        badge: String,
        /// Granting administrator
        #[arg(long)]
        by: Option<String>,
        /// Reason
        #[arg(short, long)]
        reason: Option<String>,
        /// Bonus points overriding the badge's points
        #[arg(long)]
        bonus: Option<i64>,
    },
    /// Grant a badge to users, organization subtrees and tags
    BatchGrant {
        /// Badge ID
        badge: String,
        /// User IDs (repeatable)
        #[arg(short, long = "user")]
        users: Vec<String>,
        /// Organization IDs, descendants included (repeatable)
        #[arg(short, long = "org")]
        orgs: Vec<String>,
        /// Tag IDs (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
        /// Granting administrator, checked against their quota
        #[arg(long)]
        by: Option<String>,
        /// Reason
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Revoke a grant
    Revoke {
        /// Grant ID
        grant_id: String,
        /// Acting administrator
        #[arg(long)]
        by: Option<String>,
        /// Reason
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// Expire every grant past its expiry date
    Expire,
    /// List a user's grants
    List {
        /// User ID
        user: String,
    },
    /// Show the audit trail of a grant
    History {
        /// Grant ID
        grant_id: String,
    },
}

/// Grant display row
#[derive(Debug, Serialize, Tabled)]
struct GrantRow {
    /// Grant ID
    id: String,
    /// User ID
    user_id: String,
    /// Badge ID
    badge_id: String,
    /// Status
    status: String,
    /// Granted at
    granted_at: String,
    /// Expires at
    expires_at: String,
}

impl From<&Grant> for GrantRow {
    fn from(g: &Grant) -> Self {
        Self {
            id: g.id.to_string(),
            user_id: g.user_id.to_string(),
            badge_id: g.badge_id.to_string(),
            status: g.status.to_string(),
            granted_at: g.granted_at.format("%Y-%m-%d %H:%M").to_string(),
            expires_at: g
                .expires_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Batch result display row
#[derive(Debug, Serialize, Tabled)]
struct BatchRow {
    /// User ID
    user_id: String,
    /// Outcome
    status: String,
    /// Detail
    detail: String,
}

/// Audit entry display row
#[derive(Debug, Serialize, Tabled)]
struct AuditRow {
    /// When
    created_at: String,
    /// Action
    action: String,
    /// Actor
    actor: String,
    /// Details
    details: String,
}

/// Execute badge commands
pub async fn execute(
    args: &BadgeArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    if let BadgeCommand::History { grant_id } = &args.command {
        return history(grant_id, config, format).await;
    }

    let engine = super::connect_engine(config).await?;

    match &args.command {
        BadgeCommand::Grant {
            user,
            badge,
            by,
            reason,
            bonus,
        } => {
            let request = GrantRequest {
                user_id: user.clone(),
                badge_id: badge.clone(),
                granted_by: by.clone(),
                reason: reason.clone(),
                bonus_points: *bonus,
                source_event_id: None,
            };
            let outcome = engine.grant_badge(request).await?;
            match format {
                OutputFormat::Json => output::print_json(&outcome),
                OutputFormat::Table => {
                    output::print_success(&format!(
                        "Badge '{}' granted to '{}'",
                        outcome.badge.name, user
                    ));
                    output::print_kv("Grant", outcome.grant.id.as_str());
                    output::print_kv("Points", &outcome.points.to_string());
                }
            }
        }
        BadgeCommand::BatchGrant {
            badge,
            users,
            orgs,
            tags,
            by,
            reason,
        } => {
            let selection = Selection {
                user_ids: users.iter().map(|id| UserId::from(id.as_str())).collect(),
                org_ids: orgs.iter().map(|id| OrgId::from(id.as_str())).collect(),
                tag_ids: tags.iter().map(|id| TagId::from(id.as_str())).collect(),
            };
            let request = BatchGrantRequest {
                badge_id: badge.clone(),
                selection,
                granted_by: by.clone(),
                reason: reason.clone(),
            };
            let report = engine.batch_grant(request).await?;
            print_batch(&report, format);
        }
        BadgeCommand::Revoke {
            grant_id,
            by,
            reason,
        } => {
            let grant = engine
                .revoke_grant(
                    &GrantId::from(grant_id.as_str()),
                    by.as_deref().map(UserId::from),
                    reason.clone(),
                )
                .await?;
            output::print_list(&[GrantRow::from(&grant)], format);
        }
        BadgeCommand::Expire => {
            let expired = engine.expire_due_grants().await?;
            if format == OutputFormat::Table {
                output::print_success(&format!("{} grant(s) expired", expired.len()));
            }
            let rows: Vec<GrantRow> = expired.iter().map(GrantRow::from).collect();
            output::print_list(&rows, format);
        }
        BadgeCommand::List { user } => {
            let grants = engine.user_grants(&UserId::from(user.as_str())).await?;
            let rows: Vec<GrantRow> = grants.iter().map(GrantRow::from).collect();
            output::print_list(&rows, format);
        }
        BadgeCommand::History { .. } => {}
    }

    Ok(())
}

async fn history(grant_id: &str, config: &AppConfig, format: OutputFormat) -> Result<(), AppError> {
    let pool = super::create_db_pool(config).await?;
    let entries = AuditLogRepository::new(pool.into_pool())
        .find_by_entity(USER_BADGE_ENTITY, grant_id)
        .await?;

    let rows: Vec<AuditRow> = entries
        .iter()
        .map(|e| AuditRow {
            created_at: e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            action: e.action.clone(),
            actor: e
                .actor_id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "system".to_string()),
            details: e.details.to_string(),
        })
        .collect();
    output::print_list(&rows, format);
    Ok(())
}

fn print_batch(report: &BatchReport, format: OutputFormat) {
    if format == OutputFormat::Json {
        output::print_json(report);
        return;
    }

    let rows: Vec<BatchRow> = report
        .results
        .iter()
        .map(|r| {
            let (status, detail) = match &r.status {
                UserGrantStatus::Granted { grant_id, points } => {
                    ("granted", format!("{} (+{} points)", grant_id, points))
                }
                UserGrantStatus::Skipped { reason, message } => {
                    ("skipped", format!("{}: {}", reason, message))
                }
                UserGrantStatus::Failed { error } => ("failed", error.clone()),
            };
            BatchRow {
                user_id: r.user_id.to_string(),
                status: status.to_string(),
                detail,
            }
        })
        .collect();
    output::print_list(&rows, format);

    output::print_kv("Badge", report.badge_id.as_str());
    output::print_kv("Targets", &report.target_count.to_string());
    output::print_kv("Granted", &report.granted_count.to_string());
    output::print_kv("Skipped", &report.skipped_count.to_string());
    output::print_kv("Failed", &report.failed_count.to_string());
    output::print_kv("Quota consumed", &report.quota_consumed.to_string());
    if report.failed_count > 0 {
        output::print_warning("Some grants failed; see the table above.");
    }
    if let Some(error) = &report.quota_error {
        output::print_warning(&format!("Grants committed but quota was not charged: {error}"));
    }
}
