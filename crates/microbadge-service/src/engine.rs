//! The grant engine facade.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use microbadge_core::config::EngineConfig;
use microbadge_core::traits::Clock;
use microbadge_core::types::{EventId, GrantId, RuleId, UserId};
use microbadge_database::Stores;
use microbadge_database::store::EventStore;
use microbadge_entity::event::{Attributes, NewEvent};
use microbadge_entity::grant::{Grant, GrantRequest};
use microbadge_entity::quota::QuotaScope;

use crate::batch::{BatchGrantRequest, BatchReport, BatchService};
use crate::error::GrantError;
use crate::grant::{GrantOutcome, GrantService, LifecycleService};
use crate::points::{PointsService, PointsSummary};
use crate::quota::{QuotaCheck, QuotaLedger, QuotaSummaryItem};
use crate::rules::{CooldownChecker, EventReport, RuleMatcher, RuleTestResult};

const API_TRIGGER: &str = "api";
const BATCH_TRIGGER: &str = "batch";

/// Entry point of the badge grant engine.
///
/// Owns one instance of every service, all sharing the same stores and
/// clock.
#[derive(Clone)]
pub struct BadgeEngine {
    events: Arc<dyn EventStore>,
    clock: Arc<dyn Clock>,
    grants: GrantService,
    lifecycle: LifecycleService,
    matcher: RuleMatcher,
    ledger: QuotaLedger,
    batch: BatchService,
    points: PointsService,
}

impl BadgeEngine {
    /// Wire every service over `stores`.
    pub fn new(stores: Stores, clock: Arc<dyn Clock>, config: &EngineConfig) -> Self {
        let grants = GrantService::new(stores.badges.clone(), stores.grants.clone(), clock.clone());
        let lifecycle = LifecycleService::new(stores.grants.clone(), clock.clone());
        let cooldown = CooldownChecker::new(stores.grants.clone(), clock.clone());
        let matcher = RuleMatcher::new(
            stores.rules.clone(),
            stores.events.clone(),
            cooldown,
            grants.clone(),
            clock.clone(),
        );
        let ledger = QuotaLedger::new(
            stores.quotas.clone(),
            stores.directory.clone(),
            clock.clone(),
            config.wall_clock_offset(),
        );
        let batch = BatchService::new(
            stores.badges.clone(),
            stores.directory.clone(),
            grants.clone(),
            ledger.clone(),
            config.batch_concurrency,
            config.strict_quota,
        );
        let history_limit = i64::try_from(config.points_history_limit).unwrap_or(i64::MAX);
        let points = PointsService::new(stores.points.clone(), history_limit);

        Self {
            events: stores.events,
            clock,
            grants,
            lifecycle,
            matcher,
            ledger,
            batch,
            points,
        }
    }

    /// Store an event and run the rule set against it.
    pub async fn submit_event(&self, event: NewEvent) -> Result<EventReport, GrantError> {
        self.intake(event, API_TRIGGER).await
    }

    /// Store and match events in order. Invalid events are skipped.
    pub async fn submit_events(&self, events: Vec<NewEvent>) -> Result<Vec<EventReport>, GrantError> {
        let total = events.len();
        let mut reports = Vec::with_capacity(total);
        for event in events {
            if let Err(e) = event.validate() {
                warn!(name = %event.name, user_id = %event.user_id, error = %e, "Skipping invalid event");
                continue;
            }
            reports.push(self.intake(event, BATCH_TRIGGER).await?);
        }
        info!(total, accepted = reports.len(), "Event batch submitted");
        Ok(reports)
    }

    async fn intake(&self, event: NewEvent, default_trigger: &str) -> Result<EventReport, GrantError> {
        event.validate()?;
        let event = event.into_event(EventId::generate_event(), default_trigger, self.clock.now());
        self.events.insert_event(&event).await?;
        info!(event_id = %event.id, name = %event.name, user_id = %event.user_id, "Event received");

        let matches = self.matcher.process(&event).await?;
        Ok(EventReport {
            event_id: event.id,
            matches,
        })
    }

    /// Match every event still pending.
    pub async fn reprocess_unprocessed(&self) -> Result<Vec<EventReport>, GrantError> {
        self.matcher.reprocess_unprocessed().await
    }

    /// Grant one badge to one user.
    pub async fn grant_badge(&self, request: GrantRequest) -> Result<GrantOutcome, GrantError> {
        self.grants.grant(request).await
    }

    /// Grants of `user_id`, newest first.
    pub async fn user_grants(&self, user_id: &UserId) -> Result<Vec<Grant>, GrantError> {
        Ok(self.grants.user_grants(user_id).await?)
    }

    /// Grant one badge to every selected user.
    pub async fn batch_grant(&self, request: BatchGrantRequest) -> Result<BatchReport, GrantError> {
        self.batch.batch_grant(request).await
    }

    /// Whether `granter` may grant one more badge of `category`.
    pub async fn check_quota(
        &self,
        granter: &UserId,
        category: &str,
        scope: Option<&QuotaScope>,
    ) -> Result<QuotaCheck, GrantError> {
        Ok(self.ledger.check_quota(granter, category, scope).await?)
    }

    /// Check and consume one quota unit.
    pub async fn check_and_consume_quota(
        &self,
        granter: &UserId,
        category: &str,
        scope: Option<&QuotaScope>,
    ) -> Result<QuotaCheck, GrantError> {
        Ok(self.ledger.check_and_consume(granter, category, scope).await?)
    }

    /// Every active quota owned by `user_id` with its current usage.
    pub async fn user_quota_summary(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<QuotaSummaryItem>, GrantError> {
        Ok(self.ledger.user_quota_summary(user_id).await?)
    }

    /// Revoke a grant.
    pub async fn revoke_grant(
        &self,
        grant_id: &GrantId,
        actor: Option<UserId>,
        reason: Option<String>,
    ) -> Result<Grant, GrantError> {
        self.lifecycle.revoke(grant_id, actor, reason).await
    }

    /// Expire every grant past its expiry.
    pub async fn expire_due_grants(&self) -> Result<Vec<Grant>, GrantError> {
        self.lifecycle.expire_due().await
    }

    /// Balance and recent point history of `user_id`.
    pub async fn points_summary(&self, user_id: &UserId) -> Result<PointsSummary, GrantError> {
        Ok(self.points.summary(user_id).await?)
    }

    /// Evaluate one rule against a hypothetical event.
    pub async fn test_rule(
        &self,
        rule_id: &RuleId,
        event_name: &str,
        attributes: &Attributes,
    ) -> Result<RuleTestResult, GrantError> {
        self.matcher.test_rule(rule_id, event_name, attributes).await
    }
}
