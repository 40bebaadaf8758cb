//! Grant entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use microbadge_core::types::{BadgeId, EventId, GrantId, UserId};

use super::status::GrantStatus;

/// One badge awarded to one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grant {
    /// Unique grant identifier.
    pub id: GrantId,
    /// Holder.
    pub user_id: UserId,
    /// Granted badge.
    pub badge_id: BadgeId,
    /// When the grant was made.
    pub granted_at: DateTime<Utc>,
    /// Granting administrator; `None` for rule-driven grants.
    pub granted_by: Option<UserId>,
    /// Reason recorded with the grant.
    pub reason: Option<String>,
    /// Expiry derived from the badge definition at grant time.
    pub expires_at: Option<DateTime<Utc>>,
    /// Lifecycle status.
    pub status: GrantStatus,
    /// Event that triggered a rule-driven grant.
    pub source_event_id: Option<EventId>,
}

impl Grant {
    /// Whether the grant is active and past its expiry at `now`.
    pub fn is_due_to_expire(&self, now: DateTime<Utc>) -> bool {
        self.status == GrantStatus::Active && self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Data required to record a new active grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGrant {
    /// Pre-assigned identifier.
    pub id: GrantId,
    /// Holder.
    pub user_id: UserId,
    /// Granted badge.
    pub badge_id: BadgeId,
    /// Grant instant.
    pub granted_at: DateTime<Utc>,
    /// Granting administrator.
    pub granted_by: Option<UserId>,
    /// Reason.
    pub reason: Option<String>,
    /// Expiry.
    pub expires_at: Option<DateTime<Utc>>,
    /// Triggering event.
    pub source_event_id: Option<EventId>,
}

impl NewGrant {
    /// The active grant row this data produces.
    pub fn into_grant(self) -> Grant {
        Grant {
            id: self.id,
            user_id: self.user_id,
            badge_id: self.badge_id,
            granted_at: self.granted_at,
            granted_by: self.granted_by,
            reason: self.reason,
            expires_at: self.expires_at,
            status: GrantStatus::Active,
            source_event_id: self.source_event_id,
        }
    }
}
