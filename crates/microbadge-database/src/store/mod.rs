//! Storage interfaces consumed by the grant engine.
//!
//! Each trait covers one concern. PostgreSQL repositories in
//! [`crate::repositories`] and the [`crate::memory::MemoryStore`] implement
//! all of them; [`Stores`] bundles one implementation of each.

pub mod bundle;
pub mod traits;

pub use bundle::Stores;
pub use traits::{
    BadgeCatalog, Directory, EventStore, GrantStore, GrantWrite, PointStore, QuotaCharge,
    QuotaStore, RuleStore,
};
