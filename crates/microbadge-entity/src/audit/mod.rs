//! Audit log entities.

pub mod model;

pub use model::{AuditLogEntry, CreateAuditLogEntry, USER_BADGE_ENTITY};
