//! Rule repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::result::AppResult;
use microbadge_core::types::RuleId;
use microbadge_entity::rule::Rule;

use crate::store::RuleStore;

/// Repository for grant rules.
#[derive(Debug, Clone)]
pub struct RuleRepository {
    pool: PgPool,
}

impl RuleRepository {
    /// Create a new rule repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for RuleRepository {
    async fn enabled_rules(&self) -> AppResult<Vec<Rule>> {
        sqlx::query_as::<_, Rule>(
            "SELECT * FROM rules WHERE enabled ORDER BY priority DESC, created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load rules", e))
    }

    async fn find_rule(&self, id: &RuleId) -> AppResult<Option<Rule>> {
        sqlx::query_as::<_, Rule>("SELECT * FROM rules WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find rule", e))
    }
}
