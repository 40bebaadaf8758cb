use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use microbadge_core::error::ErrorKind;
use microbadge_core::types::{BadgeId, GrantId, OrgId, PointTransactionId, QuotaId, TagId, UserId};
use microbadge_entity::audit::CreateAuditLogEntry;
use microbadge_entity::grant::{GrantStatus, NewGrant};
use microbadge_entity::points::{NewPointTransaction, PointType};

use super::*;
use crate::store::QuotaCharge;

fn write(user: &str, badge: &str, points: i64) -> GrantWrite {
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let grant_id = GrantId::generate();
    GrantWrite {
        grant: NewGrant {
            id: grant_id.clone(),
            user_id: UserId::from(user),
            badge_id: BadgeId::from(badge),
            granted_at: now,
            granted_by: None,
            reason: None,
            expires_at: None,
            source_event_id: None,
        },
        points: (points > 0).then(|| NewPointTransaction {
            id: PointTransactionId::generate(),
            user_id: UserId::from(user),
            amount: points,
            kind: PointType::Earn,
            reference_type: "badge".to_string(),
            reference_id: grant_id.to_string(),
            description: None,
            created_at: now,
        }),
        audit: CreateAuditLogEntry::user_badge("badge_granted", grant_id.as_str(), None, json!({})),
        quota_charge: None,
    }
}

#[tokio::test]
async fn test_second_active_grant_conflicts() {
    let store = MemoryStore::new();
    store.commit_grant(write("U1", "B1", 10)).await.unwrap();

    let err = store.commit_grant(write("U1", "B1", 10)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert_eq!(store.grants().await.len(), 1);
    assert_eq!(store.points_balance(&UserId::from("U1")).await.unwrap(), 10);
    assert_eq!(store.audit_entries().await.len(), 1);
}

#[tokio::test]
async fn test_revoked_grant_frees_the_slot() {
    let store = MemoryStore::new();
    let first = store.commit_grant(write("U1", "B1", 0)).await.unwrap();
    let audit = CreateAuditLogEntry::user_badge("badge_revoked", first.id.as_str(), None, json!({}));
    let revoked = store
        .transition_status(&first.id, GrantStatus::Active, GrantStatus::Revoked, audit.clone(), Utc::now())
        .await
        .unwrap();
    assert_eq!(revoked.unwrap().status, GrantStatus::Revoked);

    let again = store
        .transition_status(&first.id, GrantStatus::Active, GrantStatus::Revoked, audit, Utc::now())
        .await
        .unwrap();
    assert!(again.is_none());

    store.commit_grant(write("U1", "B1", 0)).await.unwrap();
    assert_eq!(store.grants().await.len(), 2);
}

#[tokio::test]
async fn test_refused_quota_charge_writes_nothing() {
    let store = MemoryStore::new();
    let quota = QuotaId::from("Q1");
    store.set_usage(&quota, "2026-03", 2, Utc::now()).await;

    let mut w = write("U1", "B1", 50);
    w.quota_charge = Some(QuotaCharge {
        quota_id: quota.clone(),
        period_key: "2026-03".to_string(),
        max_grants: 2,
    });
    let err = store.commit_grant(w).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::QuotaExceeded);
    assert!(store.grants().await.is_empty());
    assert!(store.all_point_transactions().await.is_empty());
    assert_eq!(store.points_balance(&UserId::from("U1")).await.unwrap(), 0);
    assert_eq!(store.usage(&quota, "2026-03").await.unwrap(), 2);
}

#[tokio::test]
async fn test_accepted_quota_charge_increments() {
    let store = MemoryStore::new();
    let mut w = write("U1", "B1", 0);
    w.quota_charge = Some(QuotaCharge {
        quota_id: QuotaId::from("Q1"),
        period_key: "2026-03".to_string(),
        max_grants: 1,
    });
    store.commit_grant(w).await.unwrap();
    assert_eq!(store.usage(&QuotaId::from("Q1"), "2026-03").await.unwrap(), 1);
}

#[tokio::test]
async fn test_increment_usage_accumulates() {
    let store = MemoryStore::new();
    let quota = QuotaId::from("Q1");
    assert_eq!(store.usage(&quota, "2026").await.unwrap(), 0);
    assert_eq!(store.increment_usage(&quota, "2026", 3, Utc::now()).await.unwrap(), 3);
    assert_eq!(store.increment_usage(&quota, "2026", 1, Utc::now()).await.unwrap(), 4);
    assert_eq!(store.usage(&quota, "2027").await.unwrap(), 0);
    assert_eq!(store.usage_record(&quota, "2026").await.unwrap().used_count, 4);
}

#[tokio::test]
async fn test_latest_grant_and_expiry_scan() {
    let store = MemoryStore::new();
    let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let mut old = write("U1", "B1", 0).grant.into_grant();
    old.granted_at = t0;
    old.status = GrantStatus::Expired;
    store.seed_grant(old).await;

    let mut current = write("U1", "B1", 0).grant.into_grant();
    current.granted_at = t0 + Duration::days(10);
    current.expires_at = Some(t0 + Duration::days(20));
    store.seed_grant(current.clone()).await;

    let latest = store
        .latest_grant(&UserId::from("U1"), &BadgeId::from("B1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.id, current.id);

    assert!(store.due_for_expiry(t0 + Duration::days(19)).await.unwrap().is_empty());
    assert_eq!(store.due_for_expiry(t0 + Duration::days(20)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_directory_descendants() {
    let store = MemoryStore::new();
    store.add_organization("ROOT", "Root", None).await;
    store.add_organization("SALES", "Sales", Some(OrgId::from("ROOT"))).await;
    store.add_organization("OTHER", "Other", None).await;
    store.add_user("U1", Some(OrgId::from("ROOT"))).await;
    store.add_user("U2", Some(OrgId::from("SALES"))).await;
    store.add_user("U3", Some(OrgId::from("OTHER"))).await;
    store.add_user("U4", None).await;
    store.add_tag("T1", "Mentors").await;
    store.tag_user("U4", "T1").await;

    let users = store
        .resolve_descendant_org_users(&OrgId::from("ROOT"))
        .await
        .unwrap();
    assert_eq!(users, vec![UserId::from("U1"), UserId::from("U2")]);
    assert_eq!(
        store.tagged_users(&TagId::from("T1")).await.unwrap(),
        vec![UserId::from("U4")]
    );
    assert_eq!(
        store.organization_name(&OrgId::from("SALES")).await.unwrap().as_deref(),
        Some("Sales")
    );
    assert_eq!(store.tag_name(&TagId::from("T1")).await.unwrap().as_deref(), Some("Mentors"));
}

#[tokio::test]
async fn test_simulated_write_failure() {
    let store = MemoryStore::new();
    store.fail_grant_writes(true);
    let err = store.commit_grant(write("U1", "B1", 5)).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
    store.fail_grant_writes(false);
    assert!(store.commit_grant(write("U1", "B1", 5)).await.is_ok());
}
