//! Grant lifecycle status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Status of a user-badge grant.
///
/// `Active` is the only state that blocks another grant of the same badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "grant_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    /// Currently held.
    Active,
    /// Withdrawn by an administrator.
    Revoked,
    /// Past its expiry date.
    Expired,
}

impl GrantStatus {
    /// Whether the status is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GrantStatus {
    type Err = microbadge_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            "expired" => Ok(Self::Expired),
            _ => Err(microbadge_core::AppError::validation(format!(
                "Invalid grant status: '{s}'. Expected one of: active, revoked, expired"
            ))),
        }
    }
}
