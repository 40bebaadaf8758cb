//! Target selection for batch grants.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use microbadge_core::result::AppResult;
use microbadge_core::types::{OrgId, TagId, UserId};
use microbadge_database::store::Directory;
use microbadge_entity::quota::QuotaScope;

/// Users picked directly, by organization subtree and by tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Individually selected users.
    #[serde(default)]
    pub user_ids: Vec<UserId>,
    /// Organizations; each includes all of its descendants.
    #[serde(default)]
    pub org_ids: Vec<OrgId>,
    /// Tags.
    #[serde(default)]
    pub tag_ids: Vec<TagId>,
}

impl Selection {
    /// Selection of individual users.
    pub fn users<I, U>(ids: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        Self {
            user_ids: ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add an organization subtree.
    pub fn with_org(mut self, id: impl Into<OrgId>) -> Self {
        self.org_ids.push(id.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, id: impl Into<TagId>) -> Self {
        self.tag_ids.push(id.into());
        self
    }

    /// Scope the granter's quota is checked against: the first selected
    /// organization, else the first selected tag.
    pub fn quota_scope(&self) -> Option<QuotaScope> {
        self.org_ids
            .first()
            .map(|org| QuotaScope::organization(org.as_str()))
            .or_else(|| self.tag_ids.first().map(|tag| QuotaScope::tag(tag.as_str())))
    }
}

/// Resolve a selection into a deduplicated, ordered set of users.
pub async fn resolve_targets(
    directory: &dyn Directory,
    selection: &Selection,
) -> AppResult<BTreeSet<UserId>> {
    let mut targets: BTreeSet<UserId> = selection.user_ids.iter().cloned().collect();

    for org in &selection.org_ids {
        targets.extend(directory.resolve_descendant_org_users(org).await?);
    }

    for tag in &selection.tag_ids {
        targets.extend(directory.tagged_users(tag).await?);
    }

    Ok(targets)
}
