//! Store trait definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use microbadge_core::result::AppResult;
use microbadge_core::types::{BadgeId, EventId, GrantId, OrgId, QuotaId, RuleId, TagId, UserId};
use microbadge_entity::audit::CreateAuditLogEntry;
use microbadge_entity::badge::BadgeDefinition;
use microbadge_entity::event::Event;
use microbadge_entity::grant::{Grant, GrantStatus, NewGrant};
use microbadge_entity::organization::{OrgForest, Organization};
use microbadge_entity::points::{NewPointTransaction, PointTransaction};
use microbadge_entity::quota::{QuotaDefinition, QuotaScope};
use microbadge_entity::rule::Rule;

/// A quota unit charged inside a grant's storage transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaCharge {
    /// Quota to charge.
    pub quota_id: QuotaId,
    /// Period counter to charge.
    pub period_key: String,
    /// The charge only applies while `used_count < max_grants`.
    pub max_grants: i64,
}

/// Everything one grant writes, committed atomically.
#[derive(Debug, Clone)]
pub struct GrantWrite {
    /// The active grant row.
    pub grant: NewGrant,
    /// Point ledger entry, when the grant carries points.
    pub points: Option<NewPointTransaction>,
    /// Audit entry.
    pub audit: CreateAuditLogEntry,
    /// Conditional quota charge (strict quota mode).
    pub quota_charge: Option<QuotaCharge>,
}

/// Intake event persistence.
#[async_trait]
pub trait EventStore: Send + Sync + 'static {
    /// Store a new event.
    async fn insert_event(&self, event: &Event) -> AppResult<()>;

    /// Unprocessed events, oldest first.
    async fn find_unprocessed(&self, limit: Option<i64>) -> AppResult<Vec<Event>>;

    /// Flag an event as processed.
    async fn mark_processed(&self, id: &EventId, at: DateTime<Utc>) -> AppResult<()>;
}

/// Read access to grant rules.
#[async_trait]
pub trait RuleStore: Send + Sync + 'static {
    /// Enabled rules by priority descending, then creation order, then id.
    async fn enabled_rules(&self) -> AppResult<Vec<Rule>>;

    /// Find a rule by id, enabled or not.
    async fn find_rule(&self, id: &RuleId) -> AppResult<Option<Rule>>;
}

/// Read access to badge definitions.
#[async_trait]
pub trait BadgeCatalog: Send + Sync + 'static {
    /// Find a badge definition by id, including soft-deleted ones.
    async fn get_badge(&self, id: &BadgeId) -> AppResult<Option<BadgeDefinition>>;
}

/// Grant persistence.
///
/// Implementations enforce at most one active grant per (user, badge) and
/// report a violation as [`ErrorKind::Conflict`](microbadge_core::error::ErrorKind::Conflict).
#[async_trait]
pub trait GrantStore: Send + Sync + 'static {
    /// The active grant of `badge_id` held by `user_id`.
    async fn find_active_grant(
        &self,
        user_id: &UserId,
        badge_id: &BadgeId,
    ) -> AppResult<Option<Grant>>;

    /// The most recent grant of `badge_id` to `user_id`, any status.
    async fn latest_grant(&self, user_id: &UserId, badge_id: &BadgeId)
    -> AppResult<Option<Grant>>;

    /// Write grant, points, balance, audit and quota charge in one
    /// transaction. A refused quota charge fails with
    /// [`ErrorKind::QuotaExceeded`](microbadge_core::error::ErrorKind::QuotaExceeded)
    /// and writes nothing.
    async fn commit_grant(&self, write: GrantWrite) -> AppResult<Grant>;

    /// Find a grant by id.
    async fn find_grant(&self, id: &GrantId) -> AppResult<Option<Grant>>;

    /// Move a grant from `from` to `to` and write `audit` stamped `at`,
    /// atomically.
    ///
    /// Returns `None` when the grant is not in status `from`.
    async fn transition_status(
        &self,
        id: &GrantId,
        from: GrantStatus,
        to: GrantStatus,
        audit: CreateAuditLogEntry,
        at: DateTime<Utc>,
    ) -> AppResult<Option<Grant>>;

    /// Active grants whose expiry is at or before `now`.
    async fn due_for_expiry(&self, now: DateTime<Utc>) -> AppResult<Vec<Grant>>;

    /// All grants held by `user_id`, newest first.
    async fn user_grants(&self, user_id: &UserId) -> AppResult<Vec<Grant>>;
}

/// Read access to the point ledger.
#[async_trait]
pub trait PointStore: Send + Sync + 'static {
    /// Cached total points of `user_id`.
    async fn points_balance(&self, user_id: &UserId) -> AppResult<i64>;

    /// The most recent ledger entries of `user_id`, newest first.
    async fn point_transactions(
        &self,
        user_id: &UserId,
        limit: i64,
    ) -> AppResult<Vec<PointTransaction>>;
}

/// Quota definitions and usage counters.
#[async_trait]
pub trait QuotaStore: Send + Sync + 'static {
    /// Active quotas owned by `owner`, in creation order, optionally
    /// restricted to an exact scope.
    async fn active_quotas(
        &self,
        owner: &UserId,
        scope: Option<&QuotaScope>,
    ) -> AppResult<Vec<QuotaDefinition>>;

    /// Used count of `quota_id` in `period_key`; zero when never charged.
    async fn usage(&self, quota_id: &QuotaId, period_key: &str) -> AppResult<i64>;

    /// Atomically add `by` to the counter, creating it when missing.
    /// Returns the new count.
    async fn increment_usage(
        &self,
        quota_id: &QuotaId,
        period_key: &str,
        by: i64,
        now: DateTime<Utc>,
    ) -> AppResult<i64>;
}

/// Organization and tag directory.
#[async_trait]
pub trait Directory: Send + Sync + 'static {
    /// Every organization node.
    async fn organizations(&self) -> AppResult<Vec<Organization>>;

    /// Users directly assigned to any of `org_ids`.
    async fn users_in_organizations(&self, org_ids: &[OrgId]) -> AppResult<Vec<UserId>>;

    /// Users carrying `tag_id`.
    async fn tagged_users(&self, tag_id: &TagId) -> AppResult<Vec<UserId>>;

    /// Display name of an organization.
    async fn organization_name(&self, id: &OrgId) -> AppResult<Option<String>>;

    /// Display name of a tag.
    async fn tag_name(&self, id: &TagId) -> AppResult<Option<String>>;

    /// Users of `root` and every organization below it.
    async fn resolve_descendant_org_users(&self, root: &OrgId) -> AppResult<Vec<UserId>> {
        let forest = OrgForest::build(&self.organizations().await?);
        let subtree = forest.descendants_inclusive(root);
        self.users_in_organizations(&subtree).await
    }
}
