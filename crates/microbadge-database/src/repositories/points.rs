//! Point ledger repository implementation.

use async_trait::async_trait;
use sqlx::PgPool;

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::result::AppResult;
use microbadge_core::types::UserId;
use microbadge_entity::points::PointTransaction;

use crate::store::PointStore;

/// Read side of the point ledger. Writes happen in [`super::GrantRepository`].
#[derive(Debug, Clone)]
pub struct PointRepository {
    pool: PgPool,
}

impl PointRepository {
    /// Create a new point repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PointStore for PointRepository {
    async fn points_balance(&self, user_id: &UserId) -> AppResult<i64> {
        let total: Option<i64> =
            sqlx::query_scalar("SELECT total_points FROM point_balances WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to read point balance", e)
                })?;
        Ok(total.unwrap_or(0))
    }

    async fn point_transactions(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> AppResult<Vec<PointTransaction>> {
        sqlx::query_as::<_, PointTransaction>(
            "SELECT * FROM point_transactions WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC LIMIT $2",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load point transactions", e)
        })
    }
}
