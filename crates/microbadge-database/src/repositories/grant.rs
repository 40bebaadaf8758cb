//! Grant repository implementation.
//!
//! [`GrantRepository::commit_grant`] is the only writer of grants, point
//! transactions and point balances. One unique partial index
//! (`user_badges (user_id, badge_id) WHERE status = 'active'`) guards the
//! one-active-grant rule.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::result::AppResult;
use microbadge_core::types::{AuditLogId, BadgeId, GrantId, UserId};
use microbadge_entity::audit::CreateAuditLogEntry;
use microbadge_entity::grant::{Grant, GrantStatus, NewGrant};
use microbadge_entity::points::NewPointTransaction;

use super::audit::AuditLogRepository;
use crate::store::{GrantStore, GrantWrite, QuotaCharge};

/// Repository for user-badge grants and the point ledger writes that go
/// with them.
#[derive(Debug, Clone)]
pub struct GrantRepository {
    pool: PgPool,
}

impl GrantRepository {
    /// Create a new grant repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_grant(conn: &mut PgConnection, grant: &NewGrant) -> AppResult<Grant> {
        sqlx::query_as::<_, Grant>(
            "INSERT INTO user_badges \
             (id, user_id, badge_id, granted_at, granted_by, reason, expires_at, status, source_event_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, 'active', $8) RETURNING *",
        )
        .bind(&grant.id)
        .bind(&grant.user_id)
        .bind(&grant.badge_id)
        .bind(grant.granted_at)
        .bind(&grant.granted_by)
        .bind(&grant.reason)
        .bind(grant.expires_at)
        .bind(&grant.source_event_id)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            let unique = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
            if unique {
                AppError::with_source(
                    ErrorKind::Conflict,
                    format!(
                        "User {} already holds an active grant of badge {}",
                        grant.user_id, grant.badge_id
                    ),
                    e,
                )
            } else {
                AppError::with_source(ErrorKind::Database, "Failed to insert grant", e)
            }
        })
    }

    async fn insert_points(conn: &mut PgConnection, points: &NewPointTransaction) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO point_transactions \
             (id, user_id, amount, kind, reference_type, reference_id, description, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&points.id)
        .bind(&points.user_id)
        .bind(points.amount)
        .bind(points.kind)
        .bind(&points.reference_type)
        .bind(&points.reference_id)
        .bind(&points.description)
        .bind(points.created_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to insert point transaction", e)
        })?;

        sqlx::query(
            "INSERT INTO point_balances (user_id, total_points) VALUES ($1, $2) \
             ON CONFLICT (user_id) DO UPDATE SET \
                total_points = point_balances.total_points + EXCLUDED.total_points",
        )
        .bind(&points.user_id)
        .bind(points.amount)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update point balance", e)
        })?;
        Ok(())
    }

    async fn charge_quota(
        conn: &mut PgConnection,
        charge: &QuotaCharge,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let exhausted = || {
            AppError::quota_exceeded(format!(
                "Quota {} is exhausted for period {}",
                charge.quota_id, charge.period_key
            ))
        };
        if charge.max_grants <= 0 {
            return Err(exhausted());
        }

        let charged: Option<i64> = sqlx::query_scalar(
            "INSERT INTO quota_usage (quota_id, period_key, used_count, last_updated) \
             VALUES ($1, $2, 1, $4) \
             ON CONFLICT (quota_id, period_key) DO UPDATE SET \
                used_count = quota_usage.used_count + 1, \
                last_updated = EXCLUDED.last_updated \
             WHERE quota_usage.used_count < $3 \
             RETURNING used_count",
        )
        .bind(&charge.quota_id)
        .bind(&charge.period_key)
        .bind(charge.max_grants)
        .bind(now)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to charge quota", e))?;

        charged.map(|_| ()).ok_or_else(exhausted)
    }
}

#[async_trait]
impl GrantStore for GrantRepository {
    async fn find_active_grant(
        &self,
        user_id: &UserId,
        badge_id: &BadgeId,
    ) -> AppResult<Option<Grant>> {
        sqlx::query_as::<_, Grant>(
            "SELECT * FROM user_badges WHERE user_id = $1 AND badge_id = $2 AND status = 'active'",
        )
        .bind(user_id)
        .bind(badge_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find active grant", e))
    }

    async fn latest_grant(
        &self,
        user_id: &UserId,
        badge_id: &BadgeId,
    ) -> AppResult<Option<Grant>> {
        sqlx::query_as::<_, Grant>(
            "SELECT * FROM user_badges WHERE user_id = $1 AND badge_id = $2 \
             ORDER BY granted_at DESC, id DESC LIMIT 1",
        )
        .bind(user_id)
        .bind(badge_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find latest grant", e))
    }

    async fn commit_grant(&self, write: GrantWrite) -> AppResult<Grant> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin grant transaction", e)
        })?;

        let grant = Self::insert_grant(&mut *tx, &write.grant).await?;

        if let Some(charge) = &write.quota_charge {
            Self::charge_quota(&mut *tx, charge, write.grant.granted_at).await?;
        }

        if let Some(points) = &write.points {
            Self::insert_points(&mut *tx, points).await?;
        }

        let entry = write
            .audit
            .into_entry(AuditLogId::generate(), write.grant.granted_at);
        AuditLogRepository::insert_on(&mut *tx, &entry).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit grant transaction", e)
        })?;

        debug!(grant_id = %grant.id, user_id = %grant.user_id, badge_id = %grant.badge_id, "Grant committed");
        Ok(grant)
    }

    async fn find_grant(&self, id: &GrantId) -> AppResult<Option<Grant>> {
        sqlx::query_as::<_, Grant>("SELECT * FROM user_badges WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find grant", e))
    }

    async fn transition_status(
        &self,
        id: &GrantId,
        from: GrantStatus,
        to: GrantStatus,
        audit: CreateAuditLogEntry,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Grant>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin status transaction", e)
        })?;

        let updated = sqlx::query_as::<_, Grant>(
            "UPDATE user_badges SET status = $3 WHERE id = $1 AND status = $2 RETURNING *",
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update grant status", e)
        })?;

        let Some(grant) = updated else {
            return Ok(None);
        };

        let entry = audit.into_entry(AuditLogId::generate(), at);
        AuditLogRepository::insert_on(&mut *tx, &entry).await?;

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit status transaction", e)
        })?;
        Ok(Some(grant))
    }

    async fn due_for_expiry(&self, now: DateTime<Utc>) -> AppResult<Vec<Grant>> {
        sqlx::query_as::<_, Grant>(
            "SELECT * FROM user_badges \
             WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at <= $1 \
             ORDER BY expires_at ASC, id ASC",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find expiring grants", e)
        })
    }

    async fn user_grants(&self, user_id: &UserId) -> AppResult<Vec<Grant>> {
        sqlx::query_as::<_, Grant>(
            "SELECT * FROM user_badges WHERE user_id = $1 ORDER BY granted_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list user grants", e))
    }
}
