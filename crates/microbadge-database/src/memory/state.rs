//! Tables held by [`super::MemoryStore`].

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use microbadge_core::types::{BadgeId, OrgId, QuotaId, TagId, UserId};
use microbadge_entity::audit::AuditLogEntry;
use microbadge_entity::badge::BadgeDefinition;
use microbadge_entity::event::Event;
use microbadge_entity::grant::{Grant, GrantStatus};
use microbadge_entity::organization::Organization;
use microbadge_entity::points::PointTransaction;
use microbadge_entity::quota::{QuotaDefinition, QuotaUsage};
use microbadge_entity::rule::Rule;

#[derive(Debug, Default)]
pub(super) struct MemoryState {
    pub(super) events: Vec<Event>,
    pub(super) rules: Vec<Rule>,
    pub(super) badges: HashMap<BadgeId, BadgeDefinition>,
    pub(super) grants: Vec<Grant>,
    pub(super) point_transactions: Vec<PointTransaction>,
    pub(super) balances: HashMap<UserId, i64>,
    pub(super) audit_log: Vec<AuditLogEntry>,
    pub(super) quotas: Vec<QuotaDefinition>,
    pub(super) usage: HashMap<(QuotaId, String), QuotaUsage>,
    pub(super) organizations: Vec<Organization>,
    pub(super) users: BTreeMap<UserId, Option<OrgId>>,
    pub(super) tags: HashMap<TagId, String>,
    pub(super) user_tags: BTreeMap<TagId, BTreeSet<UserId>>,
}

impl MemoryState {
    pub(super) fn active_grant(&self, user_id: &UserId, badge_id: &BadgeId) -> Option<&Grant> {
        self.grants.iter().find(|g| {
            &g.user_id == user_id && &g.badge_id == badge_id && g.status == GrantStatus::Active
        })
    }

    pub(super) fn used_count(&self, quota_id: &QuotaId, period_key: &str) -> i64 {
        self.usage
            .get(&(quota_id.clone(), period_key.to_string()))
            .map(|u| u.used_count)
            .unwrap_or(0)
    }

    pub(super) fn add_usage(
        &mut self,
        quota_id: &QuotaId,
        period_key: &str,
        by: i64,
        now: DateTime<Utc>,
    ) -> i64 {
        let usage = self
            .usage
            .entry((quota_id.clone(), period_key.to_string()))
            .or_insert_with(|| QuotaUsage {
                quota_id: quota_id.clone(),
                period_key: period_key.to_string(),
                used_count: 0,
                last_updated: now,
            });
        usage.used_count += by;
        usage.last_updated = now;
        usage.used_count
    }
}
