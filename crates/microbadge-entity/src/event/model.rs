//! Event entity model.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use microbadge_core::types::{EventId, UserId};

/// Attribute map carried by an event. Values are JSON scalars.
pub type Attributes = BTreeMap<String, serde_json::Value>;

/// An immutable business fact submitted for rule matching.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Event name matched by rule conditions (e.g. `"milestone"`).
    pub name: String,
    /// Producing system.
    pub source: Option<String>,
    /// The user the event is about.
    pub user_id: UserId,
    /// How the event arrived (`"api"`, `"batch"`, ...).
    pub trigger_type: String,
    /// Metric attributes.
    #[sqlx(json)]
    pub attributes: Attributes,
    /// Whether the rule matcher has evaluated this event.
    pub processed: bool,
    /// When the event was processed.
    pub processed_at: Option<DateTime<Utc>>,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// Data required to submit a new event.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewEvent {
    /// Event name.
    #[validate(length(min = 1, max = 255, message = "Event name is required"))]
    pub name: String,
    /// Producing system.
    pub source: Option<String>,
    /// Subject user.
    #[validate(length(min = 1, message = "User ID is required"))]
    pub user_id: String,
    /// Trigger type, `"api"` when omitted.
    pub trigger_type: Option<String>,
    /// Metric attributes.
    #[serde(default)]
    pub attributes: Attributes,
}

impl NewEvent {
    /// Build a new event for `user_id` with no attributes.
    pub fn new(name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: None,
            user_id: user_id.into(),
            trigger_type: None,
            attributes: Attributes::new(),
        }
    }

    /// Add one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Materialize the stored event row.
    pub fn into_event(self, id: EventId, default_trigger: &str, now: DateTime<Utc>) -> Event {
        Event {
            id,
            name: self.name,
            source: self.source,
            user_id: UserId::new(self.user_id),
            trigger_type: self
                .trigger_type
                .unwrap_or_else(|| default_trigger.to_string()),
            attributes: self.attributes,
            processed: false,
            processed_at: None,
            created_at: now,
        }
    }
}
