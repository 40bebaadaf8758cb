//! Domain errors of the grant engine.

use thiserror::Error;

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::types::{BadgeId, GrantId, RuleId, UserId};

use crate::rules::condition::ConditionError;

/// Why a grant, batch or rule operation did not happen.
#[derive(Debug, Error)]
pub enum GrantError {
    /// The user already holds an active grant of the badge.
    #[error("User {user_id} already holds badge {badge_id}")]
    AlreadyHeld {
        /// Holder.
        user_id: UserId,
        /// Badge.
        badge_id: BadgeId,
    },

    /// The badge does not exist or cannot be granted.
    #[error("Badge {0} does not exist or cannot be granted")]
    UnknownBadge(BadgeId),

    /// No rule with this id.
    #[error("Rule {0} not found")]
    UnknownRule(RuleId),

    /// No grant with this id.
    #[error("Grant {0} not found")]
    UnknownGrant(GrantId),

    /// The granter's quota for the period is used up.
    #[error("{message}")]
    QuotaExceeded {
        /// Human-readable quota message.
        message: String,
    },

    /// The granter's remaining quota cannot cover the whole batch.
    #[error("Insufficient quota: {remaining} remaining, {required} required")]
    InsufficientQuota {
        /// Units left in the period.
        remaining: i64,
        /// Units the batch needs.
        required: i64,
    },

    /// A batch selection resolved to no users.
    #[error("No users selected")]
    EmptySelection,

    /// A rule condition could not be evaluated.
    #[error(transparent)]
    InvalidCondition(#[from] ConditionError),

    /// Request input failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The storage layer failed.
    #[error(transparent)]
    Persistence(#[from] AppError),
}

impl GrantError {
    /// Short machine-readable code, used as the skip reason in batch reports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyHeld { .. } => "already_held",
            Self::UnknownBadge(_) => "unknown_badge",
            Self::UnknownRule(_) => "unknown_rule",
            Self::UnknownGrant(_) => "unknown_grant",
            Self::QuotaExceeded { .. } => "quota_exhausted",
            Self::InsufficientQuota { .. } => "insufficient_quota",
            Self::EmptySelection => "empty_selection",
            Self::InvalidCondition(_) => "invalid_condition",
            Self::Validation(_) => "validation",
            Self::Persistence(_) => "persistence",
        }
    }
}

impl From<validator::ValidationErrors> for GrantError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl From<GrantError> for AppError {
    fn from(err: GrantError) -> Self {
        let kind = match err {
            GrantError::Persistence(inner) => return inner,
            GrantError::AlreadyHeld { .. } => ErrorKind::Conflict,
            GrantError::UnknownBadge(_)
            | GrantError::UnknownRule(_)
            | GrantError::UnknownGrant(_) => ErrorKind::NotFound,
            GrantError::QuotaExceeded { .. } | GrantError::InsufficientQuota { .. } => {
                ErrorKind::QuotaExceeded
            }
            GrantError::EmptySelection
            | GrantError::InvalidCondition(_)
            | GrantError::Validation(_) => ErrorKind::Validation,
        };
        AppError::new(kind, err.to_string())
    }
}
