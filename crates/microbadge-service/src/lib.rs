//! # microbadge-service
//!
//! The badge grant engine. Services follow constructor injection: every
//! dependency is provided at construction time via `Arc` references to the
//! store traits of `microbadge-database` and a [`Clock`](microbadge_core::traits::Clock).
//!
//! [`BadgeEngine`] wires the services together and is the entry point for
//! callers.

pub mod batch;
pub mod engine;
pub mod error;
pub mod grant;
pub mod points;
pub mod quota;
pub mod rules;

pub use batch::{
    BatchGrantRequest, BatchReport, BatchService, Selection, UserGrantResult, UserGrantStatus,
};
pub use engine::BadgeEngine;
pub use error::GrantError;
pub use grant::{GrantOutcome, GrantService, LifecycleService};
pub use points::{PointsService, PointsSummary};
pub use quota::{QuotaCheck, QuotaLedger, QuotaSummaryItem};
pub use rules::{CooldownChecker, EventReport, RuleMatch, RuleMatcher, RuleTestResult};
