//! Point transaction entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use microbadge_core::types::{PointTransactionId, UserId};

/// Kind of point movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "point_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PointType {
    /// Points earned with a badge.
    Earn,
}

/// Append-only point ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PointTransaction {
    /// Unique entry identifier.
    pub id: PointTransactionId,
    /// Account holder.
    pub user_id: UserId,
    /// Signed amount.
    pub amount: i64,
    /// Movement kind.
    pub kind: PointType,
    /// Type of the referenced record (`"badge"`).
    pub reference_type: String,
    /// Referenced record identifier (the grant id).
    pub reference_id: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

/// Data for a new ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPointTransaction {
    /// Pre-assigned identifier.
    pub id: PointTransactionId,
    /// Account holder.
    pub user_id: UserId,
    /// Signed amount.
    pub amount: i64,
    /// Movement kind.
    pub kind: PointType,
    /// Type of the referenced record.
    pub reference_type: String,
    /// Referenced record identifier.
    pub reference_id: String,
    /// Description.
    pub description: Option<String>,
    /// Entry timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewPointTransaction {
    /// The stored row this data produces.
    pub fn into_transaction(self) -> PointTransaction {
        PointTransaction {
            id: self.id,
            user_id: self.user_id,
            amount: self.amount,
            kind: self.kind,
            reference_type: self.reference_type,
            reference_id: self.reference_id,
            description: self.description,
            created_at: self.created_at,
        }
    }
}
