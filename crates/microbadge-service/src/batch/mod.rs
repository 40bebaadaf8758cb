//! Batch grants over a user selection.

pub mod selection;
pub mod service;

pub use selection::{Selection, resolve_targets};
pub use service::{BatchGrantRequest, BatchReport, BatchService, UserGrantResult, UserGrantStatus};
