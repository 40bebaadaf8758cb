//! Integration tests for event intake and rule matching.

mod helpers;

use chrono::Duration;
use serde_json::json;

use microbadge_core::types::{RuleId, UserId};
use microbadge_entity::event::{Attributes, NewEvent};
use microbadge_entity::grant::GrantStatus;
use microbadge_entity::rule::Condition;
use microbadge_service::GrantError;

fn milestone(user: &str, score: serde_json::Value) -> NewEvent {
    NewEvent::new("milestone", user).with_attribute("score", score)
}

#[tokio::test]
async fn test_milestone_rule_grants_once_within_cooldown() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 100).await;
    app.rule(
        "R1",
        Condition::event_metric("milestone", "score>=90"),
        "B001",
        Some(500),
        90,
    )
    .await;

    let first = app
        .engine
        .submit_event(milestone("U1", json!(95)))
        .await
        .unwrap();
    assert!(first.event_id.as_str().starts_with("EVT-"));
    assert_eq!(first.matches.len(), 1);
    assert_eq!(first.matches[0].points, 500);

    app.clock.advance(Duration::days(10));
    let second = app
        .engine
        .submit_event(milestone("U1", json!(95)))
        .await
        .unwrap();
    assert!(second.matches.is_empty());

    let summary = app
        .engine
        .points_summary(&UserId::from("U1"))
        .await
        .unwrap();
    assert_eq!(summary.total_points, 500);
    assert_eq!(app.store.grants().await.len(), 1);
    assert!(app.store.events().await.iter().all(|e| e.processed));
    app.assert_points_consistent("U1").await;
}

#[tokio::test]
async fn test_rule_grant_records_source_event() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 100).await;
    app.rule("R1", Condition::event("login"), "B001", None, 0).await;

    let report = app
        .engine
        .submit_event(NewEvent::new("login", "U1"))
        .await
        .unwrap();

    let grants = app.store.grants().await;
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].source_event_id.as_ref(), Some(&report.event_id));
    assert_eq!(grants[0].reason.as_deref(), Some("Rule: Rule R1"));
    assert_eq!(grants[0].granted_by, None);
    assert_eq!(report.matches[0].points, 100);
}

#[tokio::test]
async fn test_cooldown_boundary_after_revoke() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 10).await;
    app.rule(
        "R1",
        Condition::event_metric("milestone", "score >= 90"),
        "B001",
        None,
        90,
    )
    .await;

    let first = app
        .engine
        .submit_event(milestone("U1", json!(91)))
        .await
        .unwrap();
    let grant_id = first.matches[0].grant_id.clone();
    let revoked = app
        .engine
        .revoke_grant(&grant_id, Some(UserId::from("ADMIN")), None)
        .await
        .unwrap();
    assert_eq!(revoked.status, GrantStatus::Revoked);

    app.clock.advance(Duration::days(90) - Duration::seconds(1));
    let early = app
        .engine
        .submit_event(milestone("U1", json!(91)))
        .await
        .unwrap();
    assert!(early.matches.is_empty());

    app.clock.advance(Duration::seconds(1));
    let eligible = app
        .engine
        .submit_event(milestone("U1", json!(91)))
        .await
        .unwrap();
    assert_eq!(eligible.matches.len(), 1);
    app.assert_points_consistent("U1").await;
}

#[tokio::test]
async fn test_string_attributes_compare_loosely() {
    let app = helpers::TestEngine::new();
    app.badge("B010", "X", 0).await;
    app.badge("B011", "X", 0).await;
    app.rule(
        "R-APPROVED",
        Condition::metric("approval_status == approved"),
        "B010",
        None,
        0,
    )
    .await;
    app.rule("R-SCORE", Condition::metric("score >= 90"), "B011", None, 0)
        .await;

    let report = app
        .engine
        .submit_event(
            NewEvent::new("review", "U1")
                .with_attribute("approval_status", json!("approved"))
                .with_attribute("score", json!("90")),
        )
        .await
        .unwrap();

    let mut badges: Vec<&str> = report.matches.iter().map(|m| m.badge_id.as_str()).collect();
    badges.sort();
    assert_eq!(badges, vec!["B010", "B011"]);
}

#[tokio::test]
async fn test_malformed_rule_is_skipped() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 10).await;
    app.badge("B002", "X", 20).await;
    app.rule("R-BAD", Condition::metric("score ~ 3"), "B001", None, 0)
        .await;
    app.rule("R-OK", Condition::event("milestone"), "B002", None, 0)
        .await;

    let report = app
        .engine
        .submit_event(milestone("U1", json!(3)))
        .await
        .unwrap();
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.matches[0].badge_id.as_str(), "B002");
}

#[tokio::test]
async fn test_failed_grant_leaves_event_pending_for_reprocess() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 50).await;
    app.rule("R1", Condition::event("milestone"), "B001", None, 0)
        .await;

    app.store.fail_grant_writes(true);
    let err = app
        .engine
        .submit_event(milestone("U1", json!(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, GrantError::Persistence(_)));

    let events = app.store.events().await;
    assert_eq!(events.len(), 1);
    assert!(!events[0].processed);
    assert!(app.store.grants().await.is_empty());
    assert!(app.store.all_point_transactions().await.is_empty());

    app.store.fail_grant_writes(false);
    let reports = app.engine.reprocess_unprocessed().await.unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].event_id, events[0].id);
    assert_eq!(reports[0].matches.len(), 1);
    assert!(app.store.events().await[0].processed);

    assert!(app.engine.reprocess_unprocessed().await.unwrap().is_empty());
    app.assert_points_consistent("U1").await;
}

#[tokio::test]
async fn test_submit_events_skips_invalid_entries() {
    let app = helpers::TestEngine::new();
    app.badge("B001", "X", 10).await;
    app.rule("R1", Condition::event("milestone"), "B001", None, 0)
        .await;

    let reports = app
        .engine
        .submit_events(vec![
            milestone("U1", json!(1)),
            NewEvent::new("", "U2"),
            milestone("U3", json!(1)),
        ])
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    let events = app.store.events().await;
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.trigger_type == "batch"));
    assert_eq!(app.store.grants().await.len(), 2);
}

#[tokio::test]
async fn test_invalid_single_event_is_rejected() {
    let app = helpers::TestEngine::new();
    let err = app
        .engine
        .submit_event(NewEvent::new("milestone", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, GrantError::Validation(_)));
    assert!(app.store.events().await.is_empty());
}

#[tokio::test]
async fn test_rule_dry_run() {
    let app = helpers::TestEngine::new();
    app.rule(
        "R1",
        Condition::All {
            and: vec![
                Condition::event("milestone"),
                Condition::metric("score >= 90"),
            ],
        },
        "B001",
        Some(500),
        90,
    )
    .await;

    let mut attributes = Attributes::new();
    attributes.insert("score".to_string(), json!(92));
    let result = app
        .engine
        .test_rule(&RuleId::from("R1"), "milestone", &attributes)
        .await
        .unwrap();
    assert!(result.matched);
    assert_eq!(result.points, Some(500));
    assert!(app.store.grants().await.is_empty());

    let miss = app
        .engine
        .test_rule(&RuleId::from("R1"), "login", &attributes)
        .await
        .unwrap();
    assert!(!miss.matched);

    assert!(matches!(
        app.engine
            .test_rule(&RuleId::from("NOPE"), "milestone", &attributes)
            .await,
        Err(GrantError::UnknownRule(_))
    ));
}

#[tokio::test]
async fn test_all_matching_rules_fire_in_priority_order() {
    let app = helpers::TestEngine::new();
    for badge in ["B-TOP", "B-TIE-LATE", "B-TIE-Y", "B-TIE-Z", "B-LOW", "B-OFF"] {
        app.badge(badge, "X", 10).await;
    }
    let login = || Condition::event("login");
    let base = helpers::start_time();

    let mut low = app.rule("R-LOW", login(), "B-LOW", None, 0).await;
    low.priority = 1;
    app.store.add_rule(low).await;

    let mut late = app.rule("R-A", login(), "B-TIE-LATE", None, 0).await;
    late.priority = 5;
    late.created_at = base + Duration::hours(1);
    app.store.add_rule(late).await;

    let mut tie_z = app.rule("R-Z", login(), "B-TIE-Z", None, 0).await;
    tie_z.priority = 5;
    app.store.add_rule(tie_z).await;

    let mut tie_y = app.rule("R-Y", login(), "B-TIE-Y", None, 0).await;
    tie_y.priority = 5;
    app.store.add_rule(tie_y).await;

    let mut top = app.rule("R-TOP", login(), "B-TOP", None, 0).await;
    top.priority = 10;
    app.store.add_rule(top).await;

    let mut off = app.rule("R-OFF", login(), "B-OFF", None, 0).await;
    off.priority = 20;
    off.enabled = false;
    app.store.add_rule(off).await;

    let report = app
        .engine
        .submit_event(NewEvent::new("login", "U1"))
        .await
        .unwrap();

    let order: Vec<&str> = report.matches.iter().map(|m| m.badge_id.as_str()).collect();
    assert_eq!(order, ["B-TOP", "B-TIE-Y", "B-TIE-Z", "B-TIE-LATE", "B-LOW"]);

    let grants = app.store.grants().await;
    assert_eq!(grants.len(), 5);
    assert!(grants.iter().all(|g| g.badge_id.as_str() != "B-OFF"));
    app.assert_points_consistent("U1").await;
}
