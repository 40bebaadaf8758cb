//! # microbadge-database
//!
//! PostgreSQL connection management, the storage traits consumed by the
//! grant engine, their PostgreSQL repository implementations, and an
//! in-memory store for single-process use and tests.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{
    BadgeCatalog, Directory, EventStore, GrantStore, GrantWrite, PointStore, QuotaCharge,
    QuotaStore, RuleStore, Stores,
};
