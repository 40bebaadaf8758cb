//! Audit log repository implementation.

use sqlx::{PgConnection, PgPool};

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::result::AppResult;
use microbadge_entity::audit::AuditLogEntry;

/// Repository for audit log entries.
#[derive(Debug, Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    /// Create a new audit log repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Entries written for one record, newest first.
    pub async fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> AppResult<Vec<AuditLogEntry>> {
        sqlx::query_as::<_, AuditLogEntry>(
            "SELECT * FROM audit_log WHERE entity_type = $1 AND entity_id = $2 \
             ORDER BY created_at DESC, id DESC",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find audit entries", e))
    }

    /// Write `entry` on an open connection or transaction.
    pub(crate) async fn insert_on(conn: &mut PgConnection, entry: &AuditLogEntry) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO audit_log (id, action, entity_type, entity_id, actor_id, details, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&entry.id)
        .bind(&entry.action)
        .bind(&entry.entity_type)
        .bind(&entry.entity_id)
        .bind(&entry.actor_id)
        .bind(&entry.details)
        .bind(entry.created_at)
        .execute(conn)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create audit entry", e))?;
        Ok(())
    }
}
