//! Quota checks and consumption.

use std::sync::Arc;

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use microbadge_core::result::AppResult;
use microbadge_core::traits::Clock;
use microbadge_core::types::{OrgId, QuotaId, TagId, UserId};
use microbadge_database::store::{Directory, QuotaStore};
use microbadge_entity::quota::{QuotaDefinition, QuotaScope, ScopeType};

use super::period::{local_date, period_key};

/// Result of a quota check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaCheck {
    /// Whether a grant may proceed.
    pub allowed: bool,
    /// The governing quota; `None` means unlimited.
    pub quota: Option<QuotaDefinition>,
    /// Units left in the period; `-1` when unlimited.
    pub remaining: i64,
    /// Period key of the governing quota.
    pub period_key: Option<String>,
    /// Human-readable summary.
    pub message: String,
}

impl QuotaCheck {
    fn unlimited(message: &str) -> Self {
        Self {
            allowed: true,
            quota: None,
            remaining: -1,
            period_key: None,
            message: message.to_string(),
        }
    }

    /// Whether a quota governs the check.
    pub fn is_limited(&self) -> bool {
        self.quota.is_some()
    }
}

/// One line of a granter's quota overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotaSummaryItem {
    /// The definition.
    #[serde(flatten)]
    pub quota: QuotaDefinition,
    /// Organization or tag name, or the scope id when unknown.
    pub scope_name: String,
    /// Current period key.
    pub period_key: String,
    /// Units used this period.
    pub used_count: i64,
    /// Units left this period.
    pub remaining_count: i64,
    /// `day`, `week`, `month` or `year`.
    pub period_label: String,
}

/// Quota ledger over `(quota, period key)` usage counters.
#[derive(Clone)]
pub struct QuotaLedger {
    quotas: Arc<dyn QuotaStore>,
    directory: Arc<dyn Directory>,
    clock: Arc<dyn Clock>,
    offset: FixedOffset,
}

impl QuotaLedger {
    /// Creates a new quota ledger. Period keys use the calendar at `offset`.
    pub fn new(
        quotas: Arc<dyn QuotaStore>,
        directory: Arc<dyn Directory>,
        clock: Arc<dyn Clock>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            quotas,
            directory,
            clock,
            offset,
        }
    }

    /// Current period key of `quota`.
    pub fn current_period_key(&self, quota: &QuotaDefinition) -> String {
        period_key(quota.period_type, local_date(self.clock.now(), self.offset))
    }

    /// Check whether `granter` may grant one more badge of `category`.
    ///
    /// The first active definition in creation order whose category is
    /// unset or equal governs, optionally restricted to an exact scope.
    pub async fn check_quota(
        &self,
        granter: &UserId,
        category: &str,
        scope: Option<&QuotaScope>,
    ) -> AppResult<QuotaCheck> {
        let quotas = self.quotas.active_quotas(granter, scope).await?;
        if quotas.is_empty() {
            return Ok(QuotaCheck::unlimited("No quota limit"));
        }

        let Some(quota) = quotas.into_iter().find(|q| q.covers_category(category)) else {
            return Ok(QuotaCheck::unlimited("No matching quota rule"));
        };

        let key = self.current_period_key(&quota);
        let used = self.quotas.usage(&quota.id, &key).await?;
        let remaining = i64::from(quota.max_grants) - used;

        debug!(
            granter = %granter,
            quota_id = %quota.id,
            period_key = %key,
            used,
            remaining,
            "Quota checked"
        );

        if remaining <= 0 {
            let message = format!(
                "Quota exhausted: at most {} {} badges per {}",
                quota.max_grants,
                quota.badge_category.as_deref().unwrap_or("(all categories)"),
                quota.period_type.label()
            );
            return Ok(QuotaCheck {
                allowed: false,
                quota: Some(quota),
                remaining: 0,
                period_key: Some(key),
                message,
            });
        }

        Ok(QuotaCheck {
            allowed: true,
            quota: Some(quota),
            remaining,
            period_key: Some(key),
            message: format!("Remaining quota: {remaining}"),
        })
    }

    /// Add one unit to a usage counter. Returns the new count.
    pub async fn consume_quota(&self, quota_id: &QuotaId, period_key: &str) -> AppResult<i64> {
        self.consume_units(quota_id, period_key, 1).await
    }

    /// Add `units` to a usage counter in one atomic increment.
    pub async fn consume_units(
        &self,
        quota_id: &QuotaId,
        period_key: &str,
        units: i64,
    ) -> AppResult<i64> {
        let used = self
            .quotas
            .increment_usage(quota_id, period_key, units, self.clock.now())
            .await?;
        info!(quota_id = %quota_id, period_key = %period_key, units, used, "Quota consumed");
        Ok(used)
    }

    /// Check, then consume one unit when a quota governs and allows.
    pub async fn check_and_consume(
        &self,
        granter: &UserId,
        category: &str,
        scope: Option<&QuotaScope>,
    ) -> AppResult<QuotaCheck> {
        let mut check = self.check_quota(granter, category, scope).await?;
        if check.allowed {
            if let (Some(quota), Some(key)) = (&check.quota, &check.period_key) {
                self.consume_quota(&quota.id, key).await?;
                check.remaining -= 1;
            }
        }
        Ok(check)
    }

    /// Overview of every active quota owned by `user_id`.
    pub async fn user_quota_summary(&self, user_id: &UserId) -> AppResult<Vec<QuotaSummaryItem>> {
        let quotas = self.quotas.active_quotas(user_id, None).await?;
        let mut items = Vec::with_capacity(quotas.len());

        for quota in quotas {
            let key = self.current_period_key(&quota);
            let used = self.quotas.usage(&quota.id, &key).await?;
            let scope_name = self.scope_name(quota.scope_type, &quota.scope_id).await?;
            items.push(QuotaSummaryItem {
                remaining_count: (i64::from(quota.max_grants) - used).max(0),
                period_label: quota.period_type.label().to_string(),
                scope_name,
                period_key: key,
                used_count: used,
                quota,
            });
        }
        Ok(items)
    }

    async fn scope_name(&self, scope_type: ScopeType, scope_id: &str) -> AppResult<String> {
        let name = match scope_type {
            ScopeType::Organization => {
                self.directory
                    .organization_name(&OrgId::from(scope_id))
                    .await?
            }
            ScopeType::Tag => self.directory.tag_name(&TagId::from(scope_id)).await?,
        };
        Ok(name.unwrap_or_else(|| scope_id.to_string()))
    }
}
