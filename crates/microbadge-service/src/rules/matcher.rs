//! Per-event rule matching.
//!
//! An event moves through received, evaluated and processed. Every enabled
//! rule is evaluated in priority order; each rule whose condition holds and
//! whose badge is out of cooldown produces one grant. The event is flagged
//! processed once all rules ran, unless a storage failure aborted the run,
//! in which case it stays pending for [`RuleMatcher::reprocess_unprocessed`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use microbadge_core::traits::Clock;
use microbadge_core::types::{BadgeId, EventId, GrantId, RuleId};
use microbadge_database::store::{EventStore, RuleStore};
use microbadge_entity::event::{Attributes, Event};
use microbadge_entity::rule::Rule;

use super::condition::{evaluate, evaluate_event};
use super::cooldown::CooldownChecker;
use crate::error::GrantError;
use crate::grant::GrantService;

/// A rule that fired and granted its badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    /// Rule that fired.
    pub rule_id: RuleId,
    /// Rule name.
    pub rule_name: String,
    /// Granted badge.
    pub badge_id: BadgeId,
    /// Points credited.
    pub points: i64,
    /// The new grant.
    pub grant_id: GrantId,
}

/// Matching outcome of one event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventReport {
    /// The event.
    pub event_id: EventId,
    /// Rules that granted a badge.
    pub matches: Vec<RuleMatch>,
}

/// Dry-run evaluation of a single rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTestResult {
    /// Rule evaluated.
    pub rule_id: RuleId,
    /// Rule name.
    pub rule_name: String,
    /// Whether the condition holds.
    pub matched: bool,
    /// Badge the rule would grant.
    pub badge_id: BadgeId,
    /// Bonus points the rule would award.
    pub points: Option<i64>,
}

/// Evaluates events against the enabled rule set.
#[derive(Clone)]
pub struct RuleMatcher {
    rules: Arc<dyn RuleStore>,
    events: Arc<dyn EventStore>,
    cooldown: CooldownChecker,
    grants: GrantService,
    clock: Arc<dyn Clock>,
}

impl RuleMatcher {
    /// Creates a new rule matcher.
    pub fn new(
        rules: Arc<dyn RuleStore>,
        events: Arc<dyn EventStore>,
        cooldown: CooldownChecker,
        grants: GrantService,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rules,
            events,
            cooldown,
            grants,
            clock,
        }
    }

    /// Run every enabled rule against `event`, then flag it processed.
    pub async fn process(&self, event: &Event) -> Result<Vec<RuleMatch>, GrantError> {
        let rules = self.rules.enabled_rules().await?;
        let mut matches = Vec::new();

        for rule in &rules {
            if let Some(matched) = self.apply_rule(rule, event).await? {
                matches.push(matched);
            }
        }

        self.events
            .mark_processed(&event.id, self.clock.now())
            .await?;

        info!(
            event_id = %event.id,
            user_id = %event.user_id,
            rules = rules.len(),
            granted = matches.len(),
            "Event processed"
        );
        Ok(matches)
    }

    async fn apply_rule(&self, rule: &Rule, event: &Event) -> Result<Option<RuleMatch>, GrantError> {
        match evaluate_event(&rule.condition, event) {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(e) => {
                warn!(rule_id = %rule.id, event_id = %event.id, error = %e, "Skipping rule with invalid condition");
                return Ok(None);
            }
        }

        let badge_id = &rule.action.grant_badge;
        if self
            .cooldown
            .in_cooldown(&event.user_id, badge_id, rule.cooldown_days)
            .await?
        {
            debug!(rule_id = %rule.id, user_id = %event.user_id, badge_id = %badge_id, "Badge in cooldown");
            return Ok(None);
        }

        let result = self
            .grants
            .grant_to(
                &event.user_id,
                badge_id,
                None,
                Some(format!("Rule: {}", rule.name)),
                rule.action.points,
                Some(event.id.clone()),
                None,
            )
            .await;

        match result {
            Ok(outcome) => Ok(Some(RuleMatch {
                rule_id: rule.id.clone(),
                rule_name: rule.name.clone(),
                badge_id: badge_id.clone(),
                points: outcome.points,
                grant_id: outcome.grant.id,
            })),
            Err(e @ (GrantError::AlreadyHeld { .. } | GrantError::UnknownBadge(_))) => {
                info!(rule_id = %rule.id, event_id = %event.id, reason = e.code(), "Rule matched without grant");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Process every pending event, oldest first.
    ///
    /// Stops at the first storage failure; events after it stay pending.
    pub async fn reprocess_unprocessed(&self) -> Result<Vec<EventReport>, GrantError> {
        let pending = self.events.find_unprocessed(None).await?;
        let mut reports = Vec::with_capacity(pending.len());
        for event in pending {
            let matches = self.process(&event).await?;
            reports.push(EventReport {
                event_id: event.id,
                matches,
            });
        }
        info!(processed = reports.len(), "Reprocessed pending events");
        Ok(reports)
    }

    /// Evaluate one rule against a hypothetical event without granting.
    pub async fn test_rule(
        &self,
        rule_id: &RuleId,
        event_name: &str,
        attributes: &Attributes,
    ) -> Result<RuleTestResult, GrantError> {
        let rule = self
            .rules
            .find_rule(rule_id)
            .await?
            .ok_or_else(|| GrantError::UnknownRule(rule_id.clone()))?;
        let matched = evaluate(&rule.condition, event_name, attributes)?;
        Ok(RuleTestResult {
            rule_id: rule.id,
            rule_name: rule.name,
            matched,
            badge_id: rule.action.grant_badge,
            points: rule.action.points,
        })
    }
}
