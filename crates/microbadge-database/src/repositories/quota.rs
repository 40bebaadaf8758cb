//! Quota definition and usage repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::result::AppResult;
use microbadge_core::types::{QuotaId, UserId};
use microbadge_entity::quota::{QuotaDefinition, QuotaScope};

use crate::store::QuotaStore;

/// Repository for granter quotas.
#[derive(Debug, Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    /// Create a new quota repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaStore for QuotaRepository {
    async fn active_quotas(
        &self,
        owner: &UserId,
        scope: Option<&QuotaScope>,
    ) -> AppResult<Vec<QuotaDefinition>> {
        let query = match scope {
            Some(scope) => sqlx::query_as::<_, QuotaDefinition>(
                "SELECT * FROM quota_definitions \
                 WHERE owner_user_id = $1 AND is_active AND scope_type = $2 AND scope_id = $3 \
                 ORDER BY created_at ASC, id ASC",
            )
            .bind(owner)
            .bind(scope.scope_type)
            .bind(&scope.scope_id),
            None => sqlx::query_as::<_, QuotaDefinition>(
                "SELECT * FROM quota_definitions WHERE owner_user_id = $1 AND is_active \
                 ORDER BY created_at ASC, id ASC",
            )
            .bind(owner),
        };

        query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load quotas", e))
    }

    async fn usage(&self, quota_id: &QuotaId, period_key: &str) -> AppResult<i64> {
        let used: Option<i64> = sqlx::query_scalar(
            "SELECT used_count FROM quota_usage WHERE quota_id = $1 AND period_key = $2",
        )
        .bind(quota_id)
        .bind(period_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to read quota usage", e))?;
        Ok(used.unwrap_or(0))
    }

    async fn increment_usage(
        &self,
        quota_id: &QuotaId,
        period_key: &str,
        by: i64,
        now: DateTime<Utc>,
    ) -> AppResult<i64> {
        sqlx::query_scalar(
            "INSERT INTO quota_usage (quota_id, period_key, used_count, last_updated) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (quota_id, period_key) DO UPDATE SET \
                used_count = quota_usage.used_count + EXCLUDED.used_count, \
                last_updated = EXCLUDED.last_updated \
             RETURNING used_count",
        )
        .bind(quota_id)
        .bind(period_key)
        .bind(by)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to consume quota", e))
    }
}
