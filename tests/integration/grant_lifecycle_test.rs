//! Integration tests for grant uniqueness, points and the grant lifecycle.

mod helpers;

use chrono::Duration;

use microbadge_core::types::{GrantId, UserId};
use microbadge_entity::grant::{GrantRequest, GrantStatus};
use microbadge_service::GrantError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_grants_leave_one_active() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 25).await;

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let engine = app.engine.clone();
            tokio::spawn(async move { engine.grant_badge(GrantRequest::new("U1", "B001")).await })
        })
        .collect();

    let mut granted = 0;
    for result in futures::future::join_all(handles).await {
        match result.expect("task panicked") {
            Ok(_) => granted += 1,
            Err(GrantError::AlreadyHeld { .. }) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(granted, 1);
    let active = app
        .store
        .grants()
        .await
        .into_iter()
        .filter(|g| g.status == GrantStatus::Active)
        .count();
    assert_eq!(active, 1);
    app.assert_points_consistent("U1").await;
    assert_eq!(
        app.engine
            .points_summary(&UserId::from("U1"))
            .await
            .unwrap()
            .total_points,
        25
    );
}

#[tokio::test]
async fn test_points_balance_tracks_ledger() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 100).await;
    app.badge("B002", "X", 0).await;
    app.badge("B003", "Y", 40).await;

    app.engine
        .grant_badge(GrantRequest::new("U1", "B001"))
        .await
        .unwrap();
    app.assert_points_consistent("U1").await;
    app.clock.advance(Duration::minutes(1));
    app.engine
        .grant_badge(GrantRequest::new("U1", "B002"))
        .await
        .unwrap();
    app.assert_points_consistent("U1").await;
    app.clock.advance(Duration::minutes(1));
    app.engine
        .grant_badge(GrantRequest::new("U1", "B003").bonus_points(7))
        .await
        .unwrap();
    app.assert_points_consistent("U1").await;

    let summary = app
        .engine
        .points_summary(&UserId::from("U1"))
        .await
        .unwrap();
    assert_eq!(summary.total_points, 107);
    assert_eq!(summary.recent.len(), 2);
    assert_eq!(summary.recent[0].amount, 7);
}

#[tokio::test]
async fn test_revoke_frees_slot_without_refund() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 30).await;

    let outcome = app
        .engine
        .grant_badge(GrantRequest::new("U1", "B001").granted_by("ADMIN"))
        .await
        .unwrap();
    let revoked = app
        .engine
        .revoke_grant(
            &outcome.grant.id,
            Some(UserId::from("ADMIN")),
            Some("Granted by mistake".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(revoked.status, GrantStatus::Revoked);

    let again = app
        .engine
        .revoke_grant(&outcome.grant.id, None, None)
        .await
        .unwrap();
    assert_eq!(again.status, GrantStatus::Revoked);

    let revocations = app
        .store
        .audit_entries()
        .await
        .into_iter()
        .filter(|e| e.action == "badge_revoked")
        .count();
    assert_eq!(revocations, 1);

    app.clock.advance(Duration::hours(1));
    let regrant = app
        .engine
        .grant_badge(GrantRequest::new("U1", "B001"))
        .await
        .unwrap();
    assert_eq!(
        app.engine
            .points_summary(&UserId::from("U1"))
            .await
            .unwrap()
            .total_points,
        60
    );

    let history = app.engine.user_grants(&UserId::from("U1")).await.unwrap();
    let statuses: Vec<(GrantId, GrantStatus)> =
        history.into_iter().map(|g| (g.id, g.status)).collect();
    assert_eq!(
        statuses,
        vec![
            (regrant.grant.id, GrantStatus::Active),
            (outcome.grant.id.clone(), GrantStatus::Revoked),
        ]
    );
    app.assert_points_consistent("U1").await;

    assert!(matches!(
        app.engine
            .revoke_grant(&GrantId::from("missing"), None, None)
            .await,
        Err(GrantError::UnknownGrant(_))
    ));
}

#[tokio::test]
async fn test_expire_due_grants() {
    let app = helpers::TestEngine::new();
    let mut badge = app.badge("B-TMP", "X", 10).await;
    badge.expires_days = Some(30);
    app.store.add_badge(badge).await;
    app.badge("B-KEEP", "X", 10).await;

    let temporary = app
        .engine
        .grant_badge(GrantRequest::new("U1", "B-TMP"))
        .await
        .unwrap();
    assert_eq!(
        temporary.grant.expires_at,
        Some(helpers::start_time() + Duration::days(30))
    );
    app.engine
        .grant_badge(GrantRequest::new("U1", "B-KEEP"))
        .await
        .unwrap();

    app.clock.advance(Duration::days(29));
    assert!(app.engine.expire_due_grants().await.unwrap().is_empty());

    app.clock.advance(Duration::days(1));
    let expired = app.engine.expire_due_grants().await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, temporary.grant.id);
    assert_eq!(expired[0].status, GrantStatus::Expired);
    assert!(app.engine.expire_due_grants().await.unwrap().is_empty());

    let audit = app.store.audit_entries().await;
    assert_eq!(
        audit.iter().filter(|e| e.action == "badge_expired").count(),
        1
    );

    app.engine
        .grant_badge(GrantRequest::new("U1", "B-TMP"))
        .await
        .unwrap();
    app.assert_points_consistent("U1").await;
}
