//! Quota scope.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a quota's scope id refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quota_scope", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ScopeType {
    /// An organization node (and its subtree).
    Organization,
    /// A user tag.
    Tag,
}

impl ScopeType {
    /// Return the scope type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Tag => "tag",
        }
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScopeType {
    type Err = microbadge_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "organization" | "org" => Ok(Self::Organization),
            "tag" => Ok(Self::Tag),
            _ => Err(microbadge_core::AppError::validation(format!(
                "Invalid scope type: '{s}'. Expected organization or tag"
            ))),
        }
    }
}

/// A concrete scope filter: type plus the organization or tag id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotaScope {
    /// Scope kind.
    pub scope_type: ScopeType,
    /// Organization or tag id.
    pub scope_id: String,
}

impl QuotaScope {
    /// Organization scope.
    pub fn organization(id: impl Into<String>) -> Self {
        Self {
            scope_type: ScopeType::Organization,
            scope_id: id.into(),
        }
    }

    /// Tag scope.
    pub fn tag(id: impl Into<String>) -> Self {
        Self {
            scope_type: ScopeType::Tag,
            scope_id: id.into(),
        }
    }
}
