//! Point balance queries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use microbadge_core::result::AppResult;
use microbadge_core::types::UserId;
use microbadge_database::store::PointStore;
use microbadge_entity::points::PointTransaction;

/// A user's balance with the latest ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsSummary {
    /// Account holder.
    pub user_id: UserId,
    /// Cached total.
    pub total_points: i64,
    /// Most recent entries, newest first.
    pub recent: Vec<PointTransaction>,
}

/// Read-only point balance service.
#[derive(Clone)]
pub struct PointsService {
    points: Arc<dyn PointStore>,
    history_limit: i64,
}

impl PointsService {
    /// Creates a new points service returning up to `history_limit` entries.
    pub fn new(points: Arc<dyn PointStore>, history_limit: i64) -> Self {
        Self {
            points,
            history_limit,
        }
    }

    /// Balance and recent history of `user_id`.
    pub async fn summary(&self, user_id: &UserId) -> AppResult<PointsSummary> {
        let total_points = self.points.points_balance(user_id).await?;
        let recent = self
            .points
            .point_transactions(user_id, self.history_limit)
            .await?;
        Ok(PointsSummary {
            user_id: user_id.clone(),
            total_points,
            recent,
        })
    }
}
