//! Shared test helpers for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};

use microbadge_core::config::EngineConfig;
use microbadge_core::traits::ManualClock;
use microbadge_core::types::{BadgeId, OrgId, QuotaId, RuleId, UserId};
use microbadge_database::{MemoryStore, Stores};
use microbadge_entity::badge::BadgeDefinition;
use microbadge_entity::quota::{PeriodType, QuotaDefinition, ScopeType};
use microbadge_entity::rule::{Condition, Rule, RuleAction};
use microbadge_service::BadgeEngine;

use std::sync::Arc;

/// Engine over an in-memory store with a pinned clock
pub struct TestEngine {
    /// The engine under test
    pub engine: BadgeEngine,
    /// Backing store, for seeding and inspection
    pub store: MemoryStore,
    /// Shared manual clock
    pub clock: ManualClock,
}

/// Saturday 2026-03-07 10:00 UTC
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 7, 10, 0, 0).unwrap()
}

impl TestEngine {
    /// Create a new test engine with the default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new test engine with `config`
    pub fn with_config(config: EngineConfig) -> Self {
        let store = MemoryStore::new();
        let clock = ManualClock::new(start_time());
        let engine = BadgeEngine::new(
            Stores::memory(store.clone()),
            Arc::new(clock.clone()),
            &config,
        );
        Self {
            engine,
            store,
            clock,
        }
    }

    /// Seed an active badge
    pub async fn badge(&self, id: &str, category: &str, points: i64) -> BadgeDefinition {
        let badge = BadgeDefinition {
            id: BadgeId::from(id),
            name: format!("Badge {}", id),
            description: None,
            category: category.to_string(),
            level: "gold".to_string(),
            points,
            expires_days: None,
            cooldown_days: 0,
            is_active: true,
            is_deleted: false,
            created_at: start_time(),
        };
        self.store.add_badge(badge.clone()).await;
        badge
    }

    /// Seed an enabled rule
    pub async fn rule(
        &self,
        id: &str,
        condition: Condition,
        badge_id: &str,
        points: Option<i64>,
        cooldown_days: i32,
    ) -> Rule {
        let rule = Rule {
            id: RuleId::from(id),
            name: format!("Rule {}", id),
            description: None,
            priority: 0,
            enabled: true,
            condition,
            action: RuleAction {
                grant_badge: BadgeId::from(badge_id),
                points,
            },
            cooldown_days,
            created_at: start_time(),
        };
        self.store.add_rule(rule.clone()).await;
        rule
    }

    /// Seed `count` users `{prefix}-01..` under `org_id`
    pub async fn users_in(&self, prefix: &str, org_id: &str, count: usize) -> Vec<UserId> {
        let mut ids = Vec::with_capacity(count);
        for n in 1..=count {
            let id = UserId::from(format!("{}-{:02}", prefix, n));
            self.store
                .add_user(id.clone(), Some(OrgId::from(org_id)))
                .await;
            ids.push(id);
        }
        ids
    }

    /// Seed an active organization-scoped quota owned by `owner`
    pub async fn org_quota(
        &self,
        id: &str,
        owner: &str,
        org_id: &str,
        category: Option<&str>,
        period_type: PeriodType,
        max_grants: i32,
    ) -> QuotaDefinition {
        let quota = QuotaDefinition {
            id: QuotaId::from(id),
            owner_user_id: UserId::from(owner),
            scope_type: ScopeType::Organization,
            scope_id: org_id.to_string(),
            badge_category: category.map(str::to_string),
            period_type,
            max_grants,
            is_active: true,
            created_at: start_time(),
        };
        self.store.add_quota(quota.clone()).await;
        quota
    }

    /// Balance of `user` must equal the sum of their ledger entries
    pub async fn assert_points_consistent(&self, user: &str) {
        let summary = self
            .engine
            .points_summary(&UserId::from(user))
            .await
            .expect("points summary");
        let ledger: i64 = self
            .store
            .all_point_transactions()
            .await
            .iter()
            .filter(|t| t.user_id.as_str() == user)
            .map(|t| t.amount)
            .sum();
        assert_eq!(summary.total_points, ledger, "balance drift for {}", user);
    }
}
