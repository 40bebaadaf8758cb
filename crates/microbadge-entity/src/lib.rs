//! # microbadge-entity
//!
//! Domain entity models for the MicroBadge grant engine. Every struct in
//! this crate represents a database table row or a domain value object. All
//! entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and
//! database entities additionally derive `sqlx::FromRow`.

pub mod audit;
pub mod badge;
pub mod event;
pub mod grant;
pub mod organization;
pub mod points;
pub mod quota;
pub mod rule;
