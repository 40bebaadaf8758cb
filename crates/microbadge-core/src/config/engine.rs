//! Grant engine configuration.

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

/// Tunables for rule matching, batch grants, and quota accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Charge quotas inside each grant's transaction instead of once after
    /// the batch loop.
    #[serde(default)]
    pub strict_quota: bool,
    /// Maximum number of grant transactions in flight during a batch.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// Offset from UTC, in minutes, of the wall clock used for quota
    /// period keys.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Number of point transactions returned by a points summary.
    #[serde(default = "default_points_history")]
    pub points_history_limit: usize,
}

impl EngineConfig {
    /// The fixed offset used to derive period keys. Out-of-range values
    /// fall back to UTC.
    pub fn wall_clock_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_quota: false,
            batch_concurrency: default_batch_concurrency(),
            utc_offset_minutes: 0,
            points_history_limit: default_points_history(),
        }
    }
}

fn default_batch_concurrency() -> usize {
    8
}

fn default_points_history() -> usize {
    50
}
