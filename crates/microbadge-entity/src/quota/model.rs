//! Quota definition and usage entity models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use microbadge_core::types::{QuotaId, UserId};

use super::period::PeriodType;
use super::scope::{QuotaScope, ScopeType};

/// A cap on how many badges one granter may award per period.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotaDefinition {
    /// Unique quota identifier.
    pub id: QuotaId,
    /// The granter the quota applies to.
    pub owner_user_id: UserId,
    /// Scope kind.
    pub scope_type: ScopeType,
    /// Organization or tag id.
    pub scope_id: String,
    /// Badge category limited; `None` limits every category.
    pub badge_category: Option<String>,
    /// Counting window.
    pub period_type: PeriodType,
    /// Maximum grants per window.
    pub max_grants: i32,
    /// Inactive quotas are ignored.
    pub is_active: bool,
    /// When the quota was defined. Overlapping definitions resolve by this.
    pub created_at: DateTime<Utc>,
}

impl QuotaDefinition {
    /// Whether the quota limits grants of `category`.
    pub fn covers_category(&self, category: &str) -> bool {
        self.badge_category
            .as_deref()
            .is_none_or(|limited| limited == category)
    }

    /// Whether the quota is defined on exactly `scope`.
    pub fn matches_scope(&self, scope: &QuotaScope) -> bool {
        self.scope_type == scope.scope_type && self.scope_id == scope.scope_id
    }
}

/// Usage counter of one quota within one period.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuotaUsage {
    /// Quota counted.
    pub quota_id: QuotaId,
    /// Period key (e.g. `"2026-02"`).
    pub period_key: String,
    /// Grants counted so far.
    pub used_count: i64,
    /// Last increment.
    pub last_updated: DateTime<Utc>,
}
