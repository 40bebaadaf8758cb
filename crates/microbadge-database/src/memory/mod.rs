//! In-memory store using a Tokio mutex for single-process deployments and
//! tests.
//!
//! Every trait method takes the one state lock, so each call is atomic and
//! the one-active-grant rule is checked and applied under the same guard.

mod seed;
mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use microbadge_core::error::AppError;
use microbadge_core::result::AppResult;
use microbadge_core::types::{
    AuditLogId, BadgeId, EventId, GrantId, OrgId, QuotaId, RuleId, TagId, UserId,
};
use microbadge_entity::audit::CreateAuditLogEntry;
use microbadge_entity::badge::BadgeDefinition;
use microbadge_entity::event::Event;
use microbadge_entity::grant::{Grant, GrantStatus};
use microbadge_entity::organization::Organization;
use microbadge_entity::points::PointTransaction;
use microbadge_entity::quota::{QuotaDefinition, QuotaScope, QuotaUsage};
use microbadge_entity::rule::Rule;

use crate::store::{
    BadgeCatalog, Directory, EventStore, GrantStore, GrantWrite, PointStore, QuotaStore,
    RuleStore,
};

use self::state::MemoryState;

/// Store keeping every table in process memory.
///
/// Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    fail_writes: Arc<AtomicBool>,
    fail_usage: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make grant commits fail with a database error until reset.
    pub fn fail_grant_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make standalone quota usage increments fail until reset.
    pub fn fail_usage_writes(&self, fail: bool) {
        self.fail_usage.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.events.iter().any(|e| e.id == event.id) {
            return Err(AppError::conflict(format!("Event {} already exists", event.id)));
        }
        state.events.push(event.clone());
        Ok(())
    }

    async fn find_unprocessed(&self, limit: Option<i64>) -> AppResult<Vec<Event>> {
        let state = self.state.lock().await;
        let mut pending: Vec<Event> = state.events.iter().filter(|e| !e.processed).cloned().collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        if let Some(limit) = limit {
            pending.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        }
        Ok(pending)
    }

    async fn mark_processed(&self, id: &EventId, at: DateTime<Utc>) -> AppResult<()> {
        let mut state = self.state.lock().await;
        match state.events.iter_mut().find(|e| &e.id == id) {
            Some(event) => {
                event.processed = true;
                event.processed_at = Some(at);
            }
            None => warn!(event_id = %id, "Attempted to mark unknown event processed"),
        }
        Ok(())
    }
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn enabled_rules(&self) -> AppResult<Vec<Rule>> {
        let state = self.state.lock().await;
        let mut rules: Vec<Rule> = state.rules.iter().filter(|r| r.enabled).cloned().collect();
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(rules)
    }

    async fn find_rule(&self, id: &RuleId) -> AppResult<Option<Rule>> {
        let state = self.state.lock().await;
        Ok(state.rules.iter().find(|r| &r.id == id).cloned())
    }
}

#[async_trait]
impl BadgeCatalog for MemoryStore {
    async fn get_badge(&self, id: &BadgeId) -> AppResult<Option<BadgeDefinition>> {
        let state = self.state.lock().await;
        Ok(state.badges.get(id).cloned())
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn find_active_grant(
        &self,
        user_id: &UserId,
        badge_id: &BadgeId,
    ) -> AppResult<Option<Grant>> {
        let state = self.state.lock().await;
        Ok(state.active_grant(user_id, badge_id).cloned())
    }

    async fn latest_grant(
        &self,
        user_id: &UserId,
        badge_id: &BadgeId,
    ) -> AppResult<Option<Grant>> {
        let state = self.state.lock().await;
        Ok(state
            .grants
            .iter()
            .filter(|g| &g.user_id == user_id && &g.badge_id == badge_id)
            .max_by(|a, b| a.granted_at.cmp(&b.granted_at).then_with(|| a.id.cmp(&b.id)))
            .cloned())
    }

    async fn commit_grant(&self, write: GrantWrite) -> AppResult<Grant> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::database("Simulated grant write failure"));
        }

        let mut state = self.state.lock().await;
        let now = write.grant.granted_at;

        if state
            .active_grant(&write.grant.user_id, &write.grant.badge_id)
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "User {} already holds an active grant of badge {}",
                write.grant.user_id, write.grant.badge_id
            )));
        }

        if let Some(charge) = &write.quota_charge {
            let used = state.used_count(&charge.quota_id, &charge.period_key);
            if charge.max_grants <= 0 || used >= charge.max_grants {
                return Err(AppError::quota_exceeded(format!(
                    "Quota {} is exhausted for period {}",
                    charge.quota_id, charge.period_key
                )));
            }
        }

        // All checks passed; nothing below can fail.
        if let Some(charge) = &write.quota_charge {
            state.add_usage(&charge.quota_id, &charge.period_key, 1, now);
        }
        if let Some(points) = write.points {
            *state.balances.entry(points.user_id.clone()).or_insert(0) += points.amount;
            state.point_transactions.push(points.into_transaction());
        }
        state
            .audit_log
            .push(write.audit.into_entry(AuditLogId::generate(), now));

        let grant = write.grant.into_grant();
        state.grants.push(grant.clone());
        debug!(grant_id = %grant.id, user_id = %grant.user_id, badge_id = %grant.badge_id, "Grant committed");
        Ok(grant)
    }

    async fn find_grant(&self, id: &GrantId) -> AppResult<Option<Grant>> {
        let state = self.state.lock().await;
        Ok(state.grants.iter().find(|g| &g.id == id).cloned())
    }

    async fn transition_status(
        &self,
        id: &GrantId,
        from: GrantStatus,
        to: GrantStatus,
        audit: CreateAuditLogEntry,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Grant>> {
        let mut state = self.state.lock().await;
        let Some(grant) = state
            .grants
            .iter_mut()
            .find(|g| &g.id == id && g.status == from)
        else {
            return Ok(None);
        };
        grant.status = to;
        let updated = grant.clone();
        state
            .audit_log
            .push(audit.into_entry(AuditLogId::generate(), at));
        Ok(Some(updated))
    }

    async fn due_for_expiry(&self, now: DateTime<Utc>) -> AppResult<Vec<Grant>> {
        let state = self.state.lock().await;
        let mut due: Vec<Grant> = state
            .grants
            .iter()
            .filter(|g| g.is_due_to_expire(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.expires_at.cmp(&b.expires_at).then_with(|| a.id.cmp(&b.id)));
        Ok(due)
    }

    async fn user_grants(&self, user_id: &UserId) -> AppResult<Vec<Grant>> {
        let state = self.state.lock().await;
        let mut grants: Vec<Grant> = state
            .grants
            .iter()
            .filter(|g| &g.user_id == user_id)
            .cloned()
            .collect();
        grants.sort_by(|a, b| b.granted_at.cmp(&a.granted_at).then_with(|| b.id.cmp(&a.id)));
        Ok(grants)
    }
}

#[async_trait]
impl PointStore for MemoryStore {
    async fn points_balance(&self, user_id: &UserId) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.balances.get(user_id).copied().unwrap_or(0))
    }

    async fn point_transactions(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> AppResult<Vec<PointTransaction>> {
        let state = self.state.lock().await;
        let mut entries: Vec<PointTransaction> = state
            .point_transactions
            .iter()
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        entries.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(entries)
    }
}

#[async_trait]
impl QuotaStore for MemoryStore {
    async fn active_quotas(
        &self,
        owner: &UserId,
        scope: Option<&QuotaScope>,
    ) -> AppResult<Vec<QuotaDefinition>> {
        let state = self.state.lock().await;
        let mut quotas: Vec<QuotaDefinition> = state
            .quotas
            .iter()
            .filter(|q| q.is_active && &q.owner_user_id == owner)
            .filter(|q| scope.is_none_or(|s| q.matches_scope(s)))
            .cloned()
            .collect();
        quotas.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(quotas)
    }

    async fn usage(&self, quota_id: &QuotaId, period_key: &str) -> AppResult<i64> {
        let state = self.state.lock().await;
        Ok(state.used_count(quota_id, period_key))
    }

    async fn increment_usage(
        &self,
        quota_id: &QuotaId,
        period_key: &str,
        by: i64,
        now: DateTime<Utc>,
    ) -> AppResult<i64> {
        if self.fail_usage.load(Ordering::SeqCst) {
            return Err(AppError::database("Simulated quota usage write failure"));
        }
        let mut state = self.state.lock().await;
        Ok(state.add_usage(quota_id, period_key, by, now))
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn organizations(&self) -> AppResult<Vec<Organization>> {
        let state = self.state.lock().await;
        Ok(state.organizations.clone())
    }

    async fn users_in_organizations(&self, org_ids: &[OrgId]) -> AppResult<Vec<UserId>> {
        let state = self.state.lock().await;
        Ok(state
            .users
            .iter()
            .filter(|(_, org)| org.as_ref().is_some_and(|o| org_ids.contains(o)))
            .map(|(user, _)| user.clone())
            .collect())
    }

    async fn tagged_users(&self, tag_id: &TagId) -> AppResult<Vec<UserId>> {
        let state = self.state.lock().await;
        Ok(state
            .user_tags
            .get(tag_id)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn organization_name(&self, id: &OrgId) -> AppResult<Option<String>> {
        let state = self.state.lock().await;
        Ok(state
            .organizations
            .iter()
            .find(|o| &o.id == id)
            .map(|o| o.name.clone()))
    }

    async fn tag_name(&self, id: &TagId) -> AppResult<Option<String>> {
        let state = self.state.lock().await;
        Ok(state.tags.get(id).cloned())
    }
}

impl MemoryStore {
    /// Snapshot of one usage counter.
    pub async fn usage_record(&self, quota_id: &QuotaId, period_key: &str) -> Option<QuotaUsage> {
        let state = self.state.lock().await;
        state
            .usage
            .get(&(quota_id.clone(), period_key.to_string()))
            .cloned()
    }
}

#[cfg(test)]
mod tests;
