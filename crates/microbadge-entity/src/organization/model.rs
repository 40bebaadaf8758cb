//! Organization entity model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use microbadge_core::types::OrgId;

/// A node of the organization hierarchy.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Organization {
    /// Unique organization identifier.
    pub id: OrgId,
    /// Display name.
    pub name: String,
    /// Parent node; `None` for roots.
    pub parent_id: Option<OrgId>,
}
