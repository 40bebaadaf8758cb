//! Badge definition entity model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use microbadge_core::types::BadgeId;

/// A badge that can be granted to users.
///
/// Definitions are soft-deleted only, so historical grants keep resolving.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BadgeDefinition {
    /// Unique badge identifier.
    pub id: BadgeId,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Category used by quota definitions.
    pub category: String,
    /// Level label (e.g. `"gold"`).
    pub level: String,
    /// Points awarded with the badge.
    pub points: i64,
    /// Validity in days; `None` never expires.
    pub expires_days: Option<i32>,
    /// Default cooldown in days.
    pub cooldown_days: i32,
    /// Whether the badge can currently be batch-granted.
    pub is_active: bool,
    /// Soft-delete marker.
    pub is_deleted: bool,
    /// When the definition was created.
    pub created_at: DateTime<Utc>,
}

impl BadgeDefinition {
    /// Whether grants of this badge may be recorded at all.
    pub fn is_grantable(&self) -> bool {
        !self.is_deleted
    }

    /// Whether batch grants of this badge are allowed.
    pub fn is_batch_grantable(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    /// Expiry instant for a grant made at `granted_at`.
    pub fn expiry_from(&self, granted_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_days
            .map(|days| granted_at + Duration::days(i64::from(days)))
    }
}
