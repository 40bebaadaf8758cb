//! Revocation and expiry of grants.
//!
//! Lifecycle transitions only change the grant status. Points already
//! credited and quota already consumed stay as they are.

use std::sync::Arc;

use serde_json::json;
use tracing::info;

use microbadge_core::traits::Clock;
use microbadge_core::types::{GrantId, UserId};
use microbadge_database::store::GrantStore;
use microbadge_entity::audit::CreateAuditLogEntry;
use microbadge_entity::grant::{Grant, GrantStatus};

use crate::error::GrantError;

/// Moves grants out of the active state.
#[derive(Clone)]
pub struct LifecycleService {
    grants: Arc<dyn GrantStore>,
    clock: Arc<dyn Clock>,
}

impl LifecycleService {
    /// Creates a new lifecycle service.
    pub fn new(grants: Arc<dyn GrantStore>, clock: Arc<dyn Clock>) -> Self {
        Self { grants, clock }
    }

    /// Revoke an active grant.
    ///
    /// A grant that is already revoked or expired is returned unchanged.
    pub async fn revoke(
        &self,
        grant_id: &GrantId,
        actor: Option<UserId>,
        reason: Option<String>,
    ) -> Result<Grant, GrantError> {
        let current = self
            .grants
            .find_grant(grant_id)
            .await?
            .ok_or_else(|| GrantError::UnknownGrant(grant_id.clone()))?;
        if current.status.is_terminal() {
            return Ok(current);
        }

        let audit = CreateAuditLogEntry::user_badge(
            "badge_revoked",
            grant_id.as_str(),
            actor,
            json!({
                "user_id": current.user_id,
                "badge_id": current.badge_id,
                "reason": reason,
            }),
        );

        let transitioned = self
            .grants
            .transition_status(
                grant_id,
                GrantStatus::Active,
                GrantStatus::Revoked,
                audit,
                self.clock.now(),
            )
            .await?;

        match transitioned {
            Some(grant) => {
                info!(grant_id = %grant_id, user_id = %grant.user_id, badge_id = %grant.badge_id, "Grant revoked");
                Ok(grant)
            }
            // Changed underneath us; report what is stored now.
            None => self
                .grants
                .find_grant(grant_id)
                .await?
                .ok_or_else(|| GrantError::UnknownGrant(grant_id.clone())),
        }
    }

    /// Expire every active grant whose expiry has passed.
    pub async fn expire_due(&self) -> Result<Vec<Grant>, GrantError> {
        let now = self.clock.now();
        let due = self.grants.due_for_expiry(now).await?;
        let mut expired = Vec::with_capacity(due.len());

        for grant in due {
            let audit = CreateAuditLogEntry::user_badge(
                "badge_expired",
                grant.id.as_str(),
                None,
                json!({
                    "user_id": grant.user_id,
                    "badge_id": grant.badge_id,
                    "expires_at": grant.expires_at,
                }),
            );
            if let Some(updated) = self
                .grants
                .transition_status(&grant.id, GrantStatus::Active, GrantStatus::Expired, audit, now)
                .await?
            {
                expired.push(updated);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "Expired grants");
        }
        Ok(expired)
    }
}
