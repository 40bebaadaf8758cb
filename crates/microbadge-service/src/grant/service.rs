//! The grant transaction.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use microbadge_core::error::ErrorKind;
use microbadge_core::result::AppResult;
use microbadge_core::traits::Clock;
use microbadge_core::types::{BadgeId, EventId, GrantId, PointTransactionId, UserId};
use microbadge_database::store::{BadgeCatalog, GrantStore, GrantWrite, QuotaCharge};
use microbadge_entity::audit::CreateAuditLogEntry;
use microbadge_entity::badge::BadgeDefinition;
use microbadge_entity::grant::{Grant, GrantRequest, NewGrant};
use microbadge_entity::points::{NewPointTransaction, PointType};

use crate::error::GrantError;

/// A grant that was recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantOutcome {
    /// The new active grant.
    pub grant: Grant,
    /// Granted badge.
    pub badge: BadgeDefinition,
    /// Points credited with the grant (zero when none).
    pub points: i64,
}

/// Records single grants: duplicate check, grant row, points and audit in
/// one storage transaction.
#[derive(Clone)]
pub struct GrantService {
    badges: Arc<dyn BadgeCatalog>,
    grants: Arc<dyn GrantStore>,
    clock: Arc<dyn Clock>,
}

impl GrantService {
    /// Creates a new grant service.
    pub fn new(
        badges: Arc<dyn BadgeCatalog>,
        grants: Arc<dyn GrantStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            badges,
            grants,
            clock,
        }
    }

    /// Validate and record a grant request.
    pub async fn grant(&self, request: GrantRequest) -> Result<GrantOutcome, GrantError> {
        request.validate()?;
        self.grant_to(
            &UserId::from(request.user_id),
            &BadgeId::from(request.badge_id),
            request.granted_by.map(UserId::from),
            request.reason,
            request.bonus_points,
            request.source_event_id.map(EventId::from),
            None,
        )
        .await
    }

    /// Record a grant of `badge_id` to `user_id`.
    ///
    /// `bonus` overrides the badge's points when non-zero. `quota_charge`
    /// is applied in the same transaction and refuses the grant when the
    /// quota is used up.
    #[allow(clippy::too_many_arguments)]
    pub async fn grant_to(
        &self,
        user_id: &UserId,
        badge_id: &BadgeId,
        granted_by: Option<UserId>,
        reason: Option<String>,
        bonus: Option<i64>,
        source_event_id: Option<EventId>,
        quota_charge: Option<QuotaCharge>,
    ) -> Result<GrantOutcome, GrantError> {
        if self
            .grants
            .find_active_grant(user_id, badge_id)
            .await?
            .is_some()
        {
            return Err(already_held(user_id, badge_id));
        }

        let badge = self
            .badges
            .get_badge(badge_id)
            .await?
            .filter(BadgeDefinition::is_grantable)
            .ok_or_else(|| GrantError::UnknownBadge(badge_id.clone()))?;

        let now = self.clock.now();
        let grant_id = GrantId::generate();
        let points = bonus.filter(|p| *p != 0).unwrap_or(badge.points);

        let point_entry = (points > 0).then(|| NewPointTransaction {
            id: PointTransactionId::generate(),
            user_id: user_id.clone(),
            amount: points,
            kind: PointType::Earn,
            reference_type: "badge".to_string(),
            reference_id: grant_id.to_string(),
            description: Some(format!("Earned badge: {}", badge.name)),
            created_at: now,
        });

        let audit = CreateAuditLogEntry::user_badge(
            "badge_granted",
            grant_id.as_str(),
            granted_by.clone(),
            json!({
                "user_id": user_id,
                "badge_id": badge.id,
                "badge_name": badge.name,
                "points": points,
                "source_event_id": source_event_id,
            }),
        );

        let write = GrantWrite {
            grant: NewGrant {
                id: grant_id,
                user_id: user_id.clone(),
                badge_id: badge.id.clone(),
                granted_at: now,
                granted_by,
                reason,
                expires_at: badge.expiry_from(now),
                source_event_id,
            },
            points: point_entry,
            audit,
            quota_charge,
        };

        let grant = match self.grants.commit_grant(write).await {
            Ok(grant) => grant,
            Err(e) if e.kind == ErrorKind::Conflict => {
                warn!(user_id = %user_id, badge_id = %badge_id, "Concurrent grant lost the race");
                return Err(already_held(user_id, badge_id));
            }
            Err(e) if e.kind == ErrorKind::QuotaExceeded => {
                return Err(GrantError::QuotaExceeded { message: e.message });
            }
            Err(e) => return Err(GrantError::Persistence(e)),
        };

        info!(
            grant_id = %grant.id,
            user_id = %user_id,
            badge_id = %badge_id,
            points,
            "Badge granted"
        );

        Ok(GrantOutcome {
            grant,
            badge,
            points: points.max(0),
        })
    }

    /// Every grant of `user_id` in any status, newest first.
    pub async fn user_grants(&self, user_id: &UserId) -> AppResult<Vec<Grant>> {
        self.grants.user_grants(user_id).await
    }
}

fn already_held(user_id: &UserId, badge_id: &BadgeId) -> GrantError {
    GrantError::AlreadyHeld {
        user_id: user_id.clone(),
        badge_id: badge_id.clone(),
    }
}
