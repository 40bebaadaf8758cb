//! Event repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;

use microbadge_core::error::{AppError, ErrorKind};
use microbadge_core::result::AppResult;
use microbadge_core::types::EventId;
use microbadge_entity::event::Event;

use crate::store::EventStore;

/// Repository for intake events.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Create a new event repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventStore for EventRepository {
    async fn insert_event(&self, event: &Event) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO events (id, name, source, user_id, trigger_type, attributes, processed, processed_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(&event.id)
        .bind(&event.name)
        .bind(&event.source)
        .bind(&event.user_id)
        .bind(&event.trigger_type)
        .bind(Json(&event.attributes))
        .bind(event.processed)
        .bind(event.processed_at)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert event", e))?;
        Ok(())
    }

    async fn find_unprocessed(&self, limit: Option<i64>) -> AppResult<Vec<Event>> {
        sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE NOT processed ORDER BY created_at ASC, id ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to load unprocessed events", e)
        })
    }

    async fn mark_processed(&self, id: &EventId, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE events SET processed = TRUE, processed_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to mark event processed", e)
            })?;
        Ok(())
    }
}
