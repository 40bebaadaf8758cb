//! Batch grant orchestration.

use std::sync::Arc;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use validator::Validate;

use microbadge_core::types::{BadgeId, GrantId, UserId};
use microbadge_database::store::{BadgeCatalog, Directory, QuotaCharge};
use microbadge_entity::badge::BadgeDefinition;

use super::selection::{Selection, resolve_targets};
use crate::error::GrantError;
use crate::grant::GrantService;
use crate::quota::{QuotaCheck, QuotaLedger};

/// A request to grant one badge to many users.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BatchGrantRequest {
    /// Badge to grant.
    #[validate(length(min = 1, message = "Badge ID is required"))]
    pub badge_id: String,
    /// Target users.
    #[serde(default)]
    pub selection: Selection,
    /// Granting administrator; quota-checked when set.
    pub granted_by: Option<String>,
    /// Reason recorded on every grant.
    pub reason: Option<String>,
}

/// Outcome for one target user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UserGrantStatus {
    /// The badge was granted.
    Granted {
        /// New grant.
        grant_id: GrantId,
        /// Points credited.
        points: i64,
    },
    /// The user was passed over.
    Skipped {
        /// Machine-readable reason (`already_held`, `quota_exhausted`, ...).
        reason: String,
        /// Human-readable detail.
        message: String,
    },
    /// The grant failed in storage.
    Failed {
        /// Error description.
        error: String,
    },
}

/// One line of a batch report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGrantResult {
    /// Target user.
    pub user_id: UserId,
    /// What happened.
    #[serde(flatten)]
    pub status: UserGrantStatus,
}

/// Aggregated result of a batch grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    /// Badge granted.
    pub badge_id: BadgeId,
    /// Distinct users targeted.
    pub target_count: usize,
    /// Users granted.
    pub granted_count: usize,
    /// Users skipped.
    pub skipped_count: usize,
    /// Users whose grant failed.
    pub failed_count: usize,
    /// Quota units charged for this batch.
    pub quota_consumed: i64,
    /// Set when the grants committed but charging the quota afterwards failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_error: Option<String>,
    /// Per-user outcomes, ordered by user id.
    pub results: Vec<UserGrantResult>,
}

/// Resolves selections, gates them on the granter's quota and grants per
/// user.
#[derive(Clone)]
pub struct BatchService {
    badges: Arc<dyn BadgeCatalog>,
    directory: Arc<dyn Directory>,
    grants: GrantService,
    ledger: QuotaLedger,
    concurrency: usize,
    strict_quota: bool,
}

impl BatchService {
    /// Creates a new batch service running up to `concurrency` grants at once.
    pub fn new(
        badges: Arc<dyn BadgeCatalog>,
        directory: Arc<dyn Directory>,
        grants: GrantService,
        ledger: QuotaLedger,
        concurrency: usize,
        strict_quota: bool,
    ) -> Self {
        Self {
            badges,
            directory,
            grants,
            ledger,
            concurrency: concurrency.max(1),
            strict_quota,
        }
    }

    /// Grant `request.badge_id` to every selected user.
    ///
    /// Fails as a whole only before the first grant: unknown or inactive
    /// badge, empty selection, exhausted or insufficient quota. After that
    /// each user gets an individual outcome.
    pub async fn batch_grant(&self, request: BatchGrantRequest) -> Result<BatchReport, GrantError> {
        request.validate()?;
        let badge_id = BadgeId::from(request.badge_id);
        let granter = request.granted_by.map(UserId::from);

        let badge = self
            .badges
            .get_badge(&badge_id)
            .await?
            .filter(BadgeDefinition::is_batch_grantable)
            .ok_or_else(|| GrantError::UnknownBadge(badge_id.clone()))?;

        let targets = resolve_targets(self.directory.as_ref(), &request.selection).await?;
        if targets.is_empty() {
            return Err(GrantError::EmptySelection);
        }
        let target_count = targets.len();

        let check = match &granter {
            Some(granter) => Some(
                self.preflight(granter, &badge, &request.selection, target_count)
                    .await?,
            ),
            None => None,
        };
        let governing = check
            .as_ref()
            .and_then(|c| Some((c.quota.as_ref()?, c.period_key.as_deref()?)));

        let charge = governing
            .filter(|_| self.strict_quota)
            .map(|(quota, key)| QuotaCharge {
                quota_id: quota.id.clone(),
                period_key: key.to_string(),
                max_grants: i64::from(quota.max_grants),
            });

        info!(
            badge_id = %badge.id,
            target_count,
            granter = ?granter.as_ref().map(UserId::as_str),
            strict = charge.is_some(),
            "Starting batch grant"
        );

        let grants = &self.grants;
        let badge_ref = &badge.id;
        let granter_ref = &granter;
        let reason_ref = &request.reason;
        let charge_ref = &charge;

        let results: Vec<UserGrantResult> = futures::stream::iter(targets)
            .map(|user_id| async move {
                let result = grants
                    .grant_to(
                        &user_id,
                        badge_ref,
                        granter_ref.clone(),
                        reason_ref.clone(),
                        None,
                        None,
                        charge_ref.clone(),
                    )
                    .await;
                let status = match result {
                    Ok(outcome) => UserGrantStatus::Granted {
                        grant_id: outcome.grant.id,
                        points: outcome.points,
                    },
                    Err(
                        e @ (GrantError::AlreadyHeld { .. }
                        | GrantError::QuotaExceeded { .. }
                        | GrantError::UnknownBadge(_)),
                    ) => UserGrantStatus::Skipped {
                        reason: e.code().to_string(),
                        message: e.to_string(),
                    },
                    Err(e) => {
                        error!(user_id = %user_id, badge_id = %badge_ref, error = %e, "Batch grant failed for user");
                        UserGrantStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                UserGrantResult { user_id, status }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let granted_count = results
            .iter()
            .filter(|r| matches!(r.status, UserGrantStatus::Granted { .. }))
            .count();
        let failed_count = results
            .iter()
            .filter(|r| matches!(r.status, UserGrantStatus::Failed { .. }))
            .count();
        let skipped_count = target_count - granted_count - failed_count;

        let mut quota_consumed = 0;
        let mut quota_error = None;
        if let Some((quota, key)) = governing {
            if charge.is_some() {
                quota_consumed = granted_count as i64;
            } else if granted_count > 0 {
                let units = granted_count as i64;
                match self.ledger.consume_units(&quota.id, key, units).await {
                    Ok(_) => quota_consumed = units,
                    Err(e) => {
                        let grant_ids: Vec<&str> = results
                            .iter()
                            .filter_map(|r| match &r.status {
                                UserGrantStatus::Granted { grant_id, .. } => Some(grant_id.as_str()),
                                _ => None,
                            })
                            .collect();
                        error!(
                            quota_id = %quota.id,
                            period_key = %key,
                            units,
                            grant_ids = ?grant_ids,
                            error = %e,
                            "Failed to consume quota after batch; grants are committed"
                        );
                        quota_error = Some(e.to_string());
                    }
                }
            }
        }

        info!(
            badge_id = %badge.id,
            target_count,
            granted_count,
            skipped_count,
            failed_count,
            "Batch grant finished"
        );

        Ok(BatchReport {
            badge_id: badge.id,
            target_count,
            granted_count,
            skipped_count,
            failed_count,
            quota_consumed,
            quota_error,
            results,
        })
    }

    async fn preflight(
        &self,
        granter: &UserId,
        badge: &BadgeDefinition,
        selection: &Selection,
        target_count: usize,
    ) -> Result<QuotaCheck, GrantError> {
        let scope = selection.quota_scope();
        let check = self
            .ledger
            .check_quota(granter, &badge.category, scope.as_ref())
            .await?;

        if !check.allowed {
            warn!(granter = %granter, badge_id = %badge.id, "Batch refused: quota exhausted");
            return Err(GrantError::QuotaExceeded {
                message: check.message,
            });
        }

        let required = target_count as i64;
        if check.is_limited() && check.remaining < required {
            warn!(
                granter = %granter,
                badge_id = %badge.id,
                remaining = check.remaining,
                required,
                "Batch refused: insufficient quota"
            );
            return Err(GrantError::InsufficientQuota {
                remaining: check.remaining,
                required,
            });
        }
        Ok(check)
    }
}
