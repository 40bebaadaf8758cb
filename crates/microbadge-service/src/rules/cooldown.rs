//! Cooldown policy.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use microbadge_core::result::AppResult;
use microbadge_core::traits::Clock;
use microbadge_core::types::{BadgeId, UserId};
use microbadge_database::store::GrantStore;
use microbadge_entity::grant::Grant;

/// Whether `latest` still blocks a new grant at `now`.
///
/// The window is `[granted_at, granted_at + cooldown_days)` regardless of
/// the grant's status, so a revoked badge cannot be re-earned early.
pub fn within_cooldown(latest: Option<&Grant>, cooldown_days: i32, now: DateTime<Utc>) -> bool {
    if cooldown_days <= 0 {
        return false;
    }
    latest.is_some_and(|grant| now < grant.granted_at + Duration::days(i64::from(cooldown_days)))
}

/// Checks the grant history of a user/badge pair against a cooldown.
#[derive(Clone)]
pub struct CooldownChecker {
    grants: Arc<dyn GrantStore>,
    clock: Arc<dyn Clock>,
}

impl CooldownChecker {
    /// Creates a new cooldown checker.
    pub fn new(grants: Arc<dyn GrantStore>, clock: Arc<dyn Clock>) -> Self {
        Self { grants, clock }
    }

    /// Whether `user_id` received `badge_id` less than `cooldown_days` ago.
    pub async fn in_cooldown(
        &self,
        user_id: &UserId,
        badge_id: &BadgeId,
        cooldown_days: i32,
    ) -> AppResult<bool> {
        if cooldown_days <= 0 {
            return Ok(false);
        }
        let latest = self.grants.latest_grant(user_id, badge_id).await?;
        Ok(within_cooldown(latest.as_ref(), cooldown_days, self.clock.now()))
    }
}
