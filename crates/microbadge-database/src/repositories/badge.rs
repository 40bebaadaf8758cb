//! Badge definition repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::result::AppResult;
use microbadge_core::types::BadgeId;
use microbadge_entity::badge::BadgeDefinition;

use crate::store::BadgeCatalog;

/// Repository for badge definitions.
#[derive(Debug, Clone)]
pub struct BadgeRepository {
    pool: PgPool,
}

impl BadgeRepository {
    /// Create a new badge repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BadgeCatalog for BadgeRepository {
    async fn get_badge(&self, id: &BadgeId) -> AppResult<Option<BadgeDefinition>> {
        sqlx::query_as::<_, BadgeDefinition>("SELECT * FROM badge_definitions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find badge", e))
    }
}
