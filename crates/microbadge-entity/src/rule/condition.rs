//! Rule condition tree.
//!
//! Stored as JSON in one of three shapes:
//!
//! ```json
//! {"event": "milestone", "metric": "score >= 90"}
//! {"and": [ ... ]}
//! {"or":  [ ... ]}
//! ```
//!
//! Composites nest freely.

use serde::{Deserialize, Serialize};

/// A node of a rule condition tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    /// Every child must hold.
    All {
        /// Children, evaluated in order.
        and: Vec<Condition>,
    },
    /// At least one child must hold.
    Any {
        /// Children, evaluated in order.
        or: Vec<Condition>,
    },
    /// An event-name test and/or a metric comparison.
    Leaf(LeafCondition),
}

/// Leaf test. Absent parts are trivially satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafCondition {
    /// Required event name (case-sensitive).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    /// Metric expression, `field operator literal`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<String>,
}

impl Condition {
    /// Leaf matching an event name only.
    pub fn event(name: impl Into<String>) -> Self {
        Self::Leaf(LeafCondition {
            event: Some(name.into()),
            metric: None,
        })
    }

    /// Leaf matching a metric expression only.
    pub fn metric(expression: impl Into<String>) -> Self {
        Self::Leaf(LeafCondition {
            event: None,
            metric: Some(expression.into()),
        })
    }

    /// Leaf matching both an event name and a metric expression.
    pub fn event_metric(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::Leaf(LeafCondition {
            event: Some(name.into()),
            metric: Some(expression.into()),
        })
    }
}
