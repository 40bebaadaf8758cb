//! Integration tests for batch grants and their quota gate.

mod helpers;

use microbadge_core::config::EngineConfig;
use microbadge_core::types::{OrgId, QuotaId, UserId};
use microbadge_entity::grant::GrantRequest;
use microbadge_entity::quota::{PeriodType, QuotaDefinition, ScopeType};
use microbadge_service::{BatchGrantRequest, GrantError, Selection, UserGrantStatus};

/// ORG-ROOT with children ORG-A (and its child ORG-A1) and ORG-B, plus an
/// unrelated ORG-Z.
async fn seed_org_tree(app: &helpers::TestEngine) {
    let store = &app.store;
    store.add_organization("ORG-ROOT", "Head Office", None).await;
    store
        .add_organization("ORG-A", "Sales", Some(OrgId::from("ORG-ROOT")))
        .await;
    store
        .add_organization("ORG-A1", "Sales East", Some(OrgId::from("ORG-A")))
        .await;
    store
        .add_organization("ORG-B", "Support", Some(OrgId::from("ORG-ROOT")))
        .await;
    store.add_organization("ORG-Z", "Elsewhere", None).await;
}

fn batch(badge: &str, selection: Selection, granter: Option<&str>) -> BatchGrantRequest {
    BatchGrantRequest {
        badge_id: badge.to_string(),
        selection,
        granted_by: granter.map(str::to_string),
        reason: Some("Quarterly recognition".to_string()),
    }
}

#[tokio::test]
async fn test_org_subtree_batch_skips_current_holders() {
    let app = helpers::TestEngine::new();
    seed_org_tree(&app).await;
    app.badge("B002", "X", 50).await;
    let mut users = app.users_in("ROOT", "ORG-ROOT", 2).await;
    users.extend(app.users_in("A", "ORG-A", 3).await);
    users.extend(app.users_in("A1", "ORG-A1", 3).await);
    users.extend(app.users_in("B", "ORG-B", 2).await);
    app.users_in("Z", "ORG-Z", 4).await;

    for holder in &users[..2] {
        app.engine
            .grant_badge(GrantRequest::new(holder.as_str(), "B002"))
            .await
            .unwrap();
    }

    let report = app
        .engine
        .batch_grant(batch("B002", Selection::default().with_org("ORG-ROOT"), None))
        .await
        .unwrap();

    assert_eq!(report.target_count, 10);
    assert_eq!(report.granted_count, 8);
    assert_eq!(report.skipped_count, 2);
    assert_eq!(report.failed_count, 0);
    assert_eq!(report.quota_consumed, 0);

    let skipped: Vec<&UserId> = report
        .results
        .iter()
        .filter(|r| matches!(&r.status, UserGrantStatus::Skipped { reason, .. } if reason == "already_held"))
        .map(|r| &r.user_id)
        .collect();
    assert_eq!(skipped, vec![&users[0], &users[1]]);
    assert!(report.results.iter().all(|r| !r.user_id.as_str().starts_with('Z')));

    for user in &users {
        app.assert_points_consistent(user.as_str()).await;
    }
}

#[tokio::test]
async fn test_overlapping_selection_targets_each_user_once() {
    let app = helpers::TestEngine::new();
    seed_org_tree(&app).await;
    app.badge("B003", "X", 5).await;
    app.users_in("A", "ORG-A", 2).await;
    app.store.add_tag("T-MVP", "MVP").await;
    app.store.tag_user("A-01", "T-MVP").await;
    app.store.add_user("LONE", None).await;
    app.store.tag_user("LONE", "T-MVP").await;

    let selection = Selection::users(["A-02", "LONE"])
        .with_org("ORG-A")
        .with_tag("T-MVP");
    let report = app
        .engine
        .batch_grant(batch("B003", selection, None))
        .await
        .unwrap();

    assert_eq!(report.target_count, 3);
    assert_eq!(report.granted_count, 3);
    let ids: Vec<&str> = report.results.iter().map(|r| r.user_id.as_str()).collect();
    assert_eq!(ids, vec!["A-01", "A-02", "LONE"]);
}

#[tokio::test]
async fn test_insufficient_quota_refuses_whole_batch() {
    let app = helpers::TestEngine::new();
    seed_org_tree(&app).await;
    app.badge("B-X", "X", 10).await;
    app.users_in("B", "ORG-B", 3).await;
    app.org_quota("Q1", "MGR", "ORG-B", Some("X"), PeriodType::Monthly, 5)
        .await;
    app.store
        .set_usage(&QuotaId::from("Q1"), "2026-03", 4, helpers::start_time())
        .await;

    let err = app
        .engine
        .batch_grant(batch("B-X", Selection::default().with_org("ORG-B"), Some("MGR")))
        .await
        .unwrap_err();

    match err {
        GrantError::InsufficientQuota {
            remaining,
            required,
        } => {
            assert_eq!(remaining, 1);
            assert_eq!(required, 3);
        }
        other => panic!("expected insufficient quota, got {other:?}"),
    }
    assert!(app.store.grants().await.is_empty());
    assert_eq!(
        app.store
            .usage_record(&QuotaId::from("Q1"), "2026-03")
            .await
            .map(|u| u.used_count),
        Some(4)
    );
}

#[tokio::test]
async fn test_exhausted_quota_refuses_batch() {
    let app = helpers::TestEngine::new();
    seed_org_tree(&app).await;
    app.badge("B-X", "X", 10).await;
    app.users_in("B", "ORG-B", 1).await;
    app.org_quota("Q1", "MGR", "ORG-B", Some("X"), PeriodType::Monthly, 2)
        .await;
    app.store
        .set_usage(&QuotaId::from("Q1"), "2026-03", 2, helpers::start_time())
        .await;

    let err = app
        .engine
        .batch_grant(batch("B-X", Selection::default().with_org("ORG-B"), Some("MGR")))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "quota_exhausted");
}

#[tokio::test]
async fn test_batch_consumes_quota_for_granted_users_only() {
    let app = helpers::TestEngine::new();
    seed_org_tree(&app).await;
    app.badge("B-X", "X", 10).await;
    let users = app.users_in("B", "ORG-B", 2).await;
    app.org_quota("Q1", "MGR", "ORG-B", Some("X"), PeriodType::Monthly, 5)
        .await;
    app.engine
        .grant_badge(GrantRequest::new(users[0].as_str(), "B-X"))
        .await
        .unwrap();

    let report = app
        .engine
        .batch_grant(batch("B-X", Selection::default().with_org("ORG-B"), Some("MGR")))
        .await
        .unwrap();
    assert_eq!(report.granted_count, 1);
    assert_eq!(report.quota_consumed, 1);

    let summary = app
        .engine
        .user_quota_summary(&UserId::from("MGR"))
        .await
        .unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].used_count, 1);
    assert_eq!(summary[0].remaining_count, 4);
    assert_eq!(summary[0].scope_name, "Support");
}

#[tokio::test]
async fn test_failed_quota_charge_keeps_committed_grants_in_report() {
    let app = helpers::TestEngine::new();
    seed_org_tree(&app).await;
    app.badge("B-X", "X", 10).await;
    app.users_in("B", "ORG-B", 2).await;
    app.org_quota("Q1", "MGR", "ORG-B", Some("X"), PeriodType::Monthly, 5)
        .await;
    app.store.fail_usage_writes(true);

    let report = app
        .engine
        .batch_grant(batch("B-X", Selection::default().with_org("ORG-B"), Some("MGR")))
        .await
        .unwrap();
    assert_eq!(report.granted_count, 2);
    assert_eq!(report.quota_consumed, 0);
    assert!(report.quota_error.is_some());
    assert!(
        report
            .results
            .iter()
            .all(|r| matches!(r.status, UserGrantStatus::Granted { .. }))
    );
    assert_eq!(app.store.grants().await.len(), 2);
    assert_eq!(
        app.store
            .usage_record(&QuotaId::from("Q1"), "2026-03")
            .await
            .map(|u| u.used_count),
        None
    );

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["quota_error"].is_string());
}

#[tokio::test]
async fn test_strict_quota_charges_inside_each_grant() {
    let app = helpers::TestEngine::with_config(EngineConfig {
        strict_quota: true,
        ..EngineConfig::default()
    });
    seed_org_tree(&app).await;
    app.badge("B-X", "X", 10).await;
    app.users_in("B", "ORG-B", 2).await;
    app.org_quota("Q1", "MGR", "ORG-B", Some("X"), PeriodType::Monthly, 5)
        .await;
    app.store
        .set_usage(&QuotaId::from("Q1"), "2026-03", 3, helpers::start_time())
        .await;

    let report = app
        .engine
        .batch_grant(batch("B-X", Selection::default().with_org("ORG-B"), Some("MGR")))
        .await
        .unwrap();
    assert_eq!(report.granted_count, 2);
    assert_eq!(report.quota_consumed, 2);
    assert_eq!(
        app.store
            .usage_record(&QuotaId::from("Q1"), "2026-03")
            .await
            .map(|u| u.used_count),
        Some(5)
    );
}

#[tokio::test]
async fn test_strict_quota_never_overconsumes_under_concurrency() {
    let app = helpers::TestEngine::with_config(EngineConfig {
        strict_quota: true,
        ..EngineConfig::default()
    });
    app.badge("B-X", "X", 10).await;
    app.store.add_tag("T-TEAM", "Team").await;
    app.store
        .add_quota(QuotaDefinition {
            id: QuotaId::from("Q-TAG"),
            owner_user_id: UserId::from("MGR"),
            scope_type: ScopeType::Tag,
            scope_id: "T-TEAM".to_string(),
            badge_category: None,
            period_type: PeriodType::Monthly,
            max_grants: 5,
            is_active: true,
            created_at: helpers::start_time(),
        })
        .await;
    app.store
        .set_usage(&QuotaId::from("Q-TAG"), "2026-03", 3, helpers::start_time())
        .await;

    let first = Selection::users(["U1", "U2"]).with_tag("T-TEAM");
    let second = Selection::users(["U3", "U4"]).with_tag("T-TEAM");
    let (r1, r2) = tokio::join!(
        app.engine.batch_grant(batch("B-X", first, Some("MGR"))),
        app.engine.batch_grant(batch("B-X", second, Some("MGR"))),
    );

    // Each batch fits the two remaining units on its own; together they don't.
    let granted: usize = [r1, r2]
        .into_iter()
        .filter_map(Result::ok)
        .map(|r| r.granted_count)
        .sum();
    let used = app
        .store
        .usage_record(&QuotaId::from("Q-TAG"), "2026-03")
        .await
        .map(|u| u.used_count)
        .unwrap_or_default();
    assert!(granted <= 2, "granted {granted} with two units left");
    assert_eq!(used, 3 + granted as i64);
    assert_eq!(app.store.grants().await.len(), granted);
}

#[tokio::test]
async fn test_preflight_failures() {
    let app = helpers::TestEngine::new();
    seed_org_tree(&app).await;
    let mut inactive = app.badge("B-OFF", "X", 1).await;
    inactive.is_active = false;
    app.store.add_badge(inactive).await;
    app.badge("B-ON", "X", 1).await;

    assert!(matches!(
        app.engine
            .batch_grant(batch("B-OFF", Selection::users(["U1"]), None))
            .await,
        Err(GrantError::UnknownBadge(_))
    ));
    assert!(matches!(
        app.engine
            .batch_grant(batch("NOPE", Selection::users(["U1"]), None))
            .await,
        Err(GrantError::UnknownBadge(_))
    ));
    assert!(matches!(
        app.engine
            .batch_grant(batch("B-ON", Selection::default().with_org("ORG-B"), None))
            .await,
        Err(GrantError::EmptySelection)
    ));
}

#[tokio::test]
async fn test_storage_failures_are_reported_per_user() {
    let app = helpers::TestEngine::new();
    app.badge("B-X", "X", 10).await;
    app.store.fail_grant_writes(true);

    let report = app
        .engine
        .batch_grant(batch("B-X", Selection::users(["U1", "U2"]), None))
        .await
        .unwrap();
    assert_eq!(report.failed_count, 2);
    assert_eq!(report.granted_count, 0);
    assert!(
        report
            .results
            .iter()
            .all(|r| matches!(r.status, UserGrantStatus::Failed { .. }))
    );
    assert!(app.store.grants().await.is_empty());
}
