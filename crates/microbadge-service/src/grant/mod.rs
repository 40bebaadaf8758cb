//! Grant recording and lifecycle.

pub mod lifecycle;
pub mod service;

pub use lifecycle::LifecycleService;
pub use service::{GrantOutcome, GrantService};
