//! Rule entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use microbadge_core::types::{BadgeId, RuleId};

use super::condition::Condition;

/// What a rule does when its condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAction {
    /// Badge to grant.
    pub grant_badge: BadgeId,
    /// Bonus points overriding the badge's own points when non-zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

/// An administrator-defined automatic grant rule.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Rule {
    /// Unique rule identifier.
    pub id: RuleId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Higher priorities are evaluated first.
    pub priority: i32,
    /// Disabled rules are never evaluated.
    pub enabled: bool,
    /// Condition tree.
    #[sqlx(json)]
    pub condition: Condition,
    /// Grant action.
    #[sqlx(json)]
    pub action: RuleAction,
    /// Minimum days between grants of the target badge to one user.
    pub cooldown_days: i32,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
}
