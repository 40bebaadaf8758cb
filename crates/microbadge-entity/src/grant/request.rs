//! Manual grant request.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A manual or rule-driven request to grant one badge to one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct GrantRequest {
    /// Recipient.
    #[validate(length(min = 1, message = "User ID is required"))]
    pub user_id: String,
    /// Badge to grant.
    #[validate(length(min = 1, message = "Badge ID is required"))]
    pub badge_id: String,
    /// Granting administrator.
    pub granted_by: Option<String>,
    /// Reason recorded with the grant.
    #[validate(length(max = 1000, message = "Reason must be at most 1000 characters"))]
    pub reason: Option<String>,
    /// Bonus points overriding the badge's points when non-zero.
    pub bonus_points: Option<i64>,
    /// Triggering event.
    pub source_event_id: Option<String>,
}

impl GrantRequest {
    /// Request to grant `badge_id` to `user_id`.
    pub fn new(user_id: impl Into<String>, badge_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            badge_id: badge_id.into(),
            ..Self::default()
        }
    }

    /// Set the granting administrator.
    pub fn granted_by(mut self, granter: impl Into<String>) -> Self {
        self.granted_by = Some(granter.into());
        self
    }

    /// Set the reason.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set bonus points.
    pub fn bonus_points(mut self, points: i64) -> Self {
        self.bonus_points = Some(points);
        self
    }

    /// Set the triggering event.
    pub fn source_event(mut self, event_id: impl Into<String>) -> Self {
        self.source_event_id = Some(event_id.into());
        self
    }
}
