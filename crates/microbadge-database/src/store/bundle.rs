//! One implementation of every store, shared behind `Arc`.

use std::sync::Arc;

use sqlx::PgPool;

use crate::memory::MemoryStore;
use crate::repositories::{
    BadgeRepository, DirectoryRepository, EventRepository, GrantRepository, PointRepository,
    QuotaRepository, RuleRepository,
};

use super::traits::{
    BadgeCatalog, Directory, EventStore, GrantStore, PointStore, QuotaStore, RuleStore,
};

/// The storage collaborators of the grant engine.
#[derive(Clone)]
pub struct Stores {
    /// Event persistence.
    pub events: Arc<dyn EventStore>,
    /// Rule access.
    pub rules: Arc<dyn RuleStore>,
    /// Badge catalog.
    pub badges: Arc<dyn BadgeCatalog>,
    /// Grant persistence.
    pub grants: Arc<dyn GrantStore>,
    /// Point ledger.
    pub points: Arc<dyn PointStore>,
    /// Quota ledger.
    pub quotas: Arc<dyn QuotaStore>,
    /// Organization and tag directory.
    pub directory: Arc<dyn Directory>,
}

impl Stores {
    /// PostgreSQL repositories sharing `pool`.
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            events: Arc::new(EventRepository::new(pool.clone())),
            rules: Arc::new(RuleRepository::new(pool.clone())),
            badges: Arc::new(BadgeRepository::new(pool.clone())),
            grants: Arc::new(GrantRepository::new(pool.clone())),
            points: Arc::new(PointRepository::new(pool.clone())),
            quotas: Arc::new(QuotaRepository::new(pool.clone())),
            directory: Arc::new(DirectoryRepository::new(pool)),
        }
    }

    /// Every store backed by the same in-memory state.
    pub fn memory(store: MemoryStore) -> Self {
        let shared = Arc::new(store);
        Self {
            events: shared.clone(),
            rules: shared.clone(),
            badges: shared.clone(),
            grants: shared.clone(),
            points: shared.clone(),
            quotas: shared.clone(),
            directory: shared,
        }
    }
}
