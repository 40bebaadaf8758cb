//! Seeding and inspection helpers for [`MemoryStore`].
//!
//! The engine treats catalog, rules, quotas and the directory as read-only;
//! these helpers stand in for the administration backend that owns them.

use chrono::{DateTime, Utc};

use microbadge_core::types::{OrgId, QuotaId, TagId, UserId};
use microbadge_entity::audit::AuditLogEntry;
use microbadge_entity::badge::BadgeDefinition;
use microbadge_entity::event::Event;
use microbadge_entity::grant::Grant;
use microbadge_entity::organization::Organization;
use microbadge_entity::points::PointTransaction;
use microbadge_entity::quota::QuotaDefinition;
use microbadge_entity::rule::Rule;

use super::MemoryStore;

impl MemoryStore {
    /// Insert or replace a badge definition.
    pub async fn add_badge(&self, badge: BadgeDefinition) {
        let mut state = self.state.lock().await;
        state.badges.insert(badge.id.clone(), badge);
    }

    /// Insert or replace a rule.
    pub async fn add_rule(&self, rule: Rule) {
        let mut state = self.state.lock().await;
        state.rules.retain(|r| r.id != rule.id);
        state.rules.push(rule);
    }

    /// Add an organization node.
    pub async fn add_organization(
        &self,
        id: impl Into<OrgId>,
        name: impl Into<String>,
        parent_id: Option<OrgId>,
    ) {
        let mut state = self.state.lock().await;
        state.organizations.push(Organization {
            id: id.into(),
            name: name.into(),
            parent_id,
        });
    }

    /// Add a user, optionally assigned to an organization.
    pub async fn add_user(&self, id: impl Into<UserId>, org_id: Option<OrgId>) {
        let mut state = self.state.lock().await;
        state.users.insert(id.into(), org_id);
    }

    /// Add a tag.
    pub async fn add_tag(&self, id: impl Into<TagId>, name: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.tags.insert(id.into(), name.into());
    }

    /// Attach a tag to a user.
    pub async fn tag_user(&self, user_id: impl Into<UserId>, tag_id: impl Into<TagId>) {
        let mut state = self.state.lock().await;
        state
            .user_tags
            .entry(tag_id.into())
            .or_default()
            .insert(user_id.into());
    }

    /// Add a quota definition.
    pub async fn add_quota(&self, quota: QuotaDefinition) {
        let mut state = self.state.lock().await;
        state.quotas.push(quota);
    }

    /// Overwrite a usage counter.
    pub async fn set_usage(&self, quota_id: &QuotaId, period_key: &str, used: i64, now: DateTime<Utc>) {
        let mut state = self.state.lock().await;
        let current = state.used_count(quota_id, period_key);
        state.add_usage(quota_id, period_key, used - current, now);
    }

    /// Insert a historical grant row as-is.
    pub async fn seed_grant(&self, grant: Grant) {
        let mut state = self.state.lock().await;
        state.grants.push(grant);
    }

    /// Every grant, in insertion order.
    pub async fn grants(&self) -> Vec<Grant> {
        self.state.lock().await.grants.clone()
    }

    /// Every point transaction, in insertion order.
    pub async fn all_point_transactions(&self) -> Vec<PointTransaction> {
        self.state.lock().await.point_transactions.clone()
    }

    /// Every audit entry, in insertion order.
    pub async fn audit_entries(&self) -> Vec<AuditLogEntry> {
        self.state.lock().await.audit_log.clone()
    }

    /// Every stored event, in insertion order.
    pub async fn events(&self) -> Vec<Event> {
        self.state.lock().await.events.clone()
    }
}
