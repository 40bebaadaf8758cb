//! Audit log entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use microbadge_core::types::{AuditLogId, UserId};

/// An immutable audit log entry recording an engine action.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    /// Unique audit entry identifier.
    pub id: AuditLogId,
    /// The action that was performed (e.g., `"badge_granted"`, `"badge_revoked"`).
    pub action: String,
    /// The type of the affected record (e.g., `"user_badge"`).
    pub entity_type: String,
    /// The affected record id.
    pub entity_id: String,
    /// The user on whose behalf the action ran; `None` for the rule engine.
    pub actor_id: Option<UserId>,
    /// Additional details about the action (JSON).
    pub details: serde_json::Value,
    /// When the action occurred.
    pub created_at: DateTime<Utc>,
}

/// Data required to create a new audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuditLogEntry {
    /// The action performed.
    pub action: String,
    /// Affected record type.
    pub entity_type: String,
    /// Affected record id.
    pub entity_id: String,
    /// Acting user.
    pub actor_id: Option<UserId>,
    /// Additional details.
    pub details: serde_json::Value,
}

/// Entity type of grant audit entries.
pub const USER_BADGE_ENTITY: &str = "user_badge";

impl CreateAuditLogEntry {
    /// Audit entry for the `user_badge` record `entity_id`.
    pub fn user_badge(
        action: impl Into<String>,
        entity_id: impl Into<String>,
        actor_id: Option<UserId>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            action: action.into(),
            entity_type: USER_BADGE_ENTITY.to_string(),
            entity_id: entity_id.into(),
            actor_id,
            details,
        }
    }

    /// The stored row, stamped with `id` and `created_at`.
    pub fn into_entry(self, id: AuditLogId, created_at: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id,
            action: self.action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            actor_id: self.actor_id,
            details: self.details,
            created_at,
        }
    }
}
