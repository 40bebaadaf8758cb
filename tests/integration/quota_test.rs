//! Integration tests for quota checks, consumption and periods.

mod helpers;

use chrono::{Duration, TimeZone, Utc};

use microbadge_core::config::EngineConfig;
use microbadge_core::types::UserId;
use microbadge_entity::quota::{PeriodType, QuotaScope};

#[tokio::test]
async fn test_check_and_consume_counts_down() {
    let app = helpers::TestEngine::new();
    app.org_quota("Q1", "MGR", "ORG-1", Some("X"), PeriodType::Weekly, 2)
        .await;
    let mgr = UserId::from("MGR");
    let scope = QuotaScope::organization("ORG-1");

    let first = app
        .engine
        .check_and_consume_quota(&mgr, "X", Some(&scope))
        .await
        .unwrap();
    assert!(first.allowed);
    assert_eq!(first.remaining, 1);
    assert_eq!(first.period_key.as_deref(), Some("2026-W10"));

    let second = app
        .engine
        .check_and_consume_quota(&mgr, "X", Some(&scope))
        .await
        .unwrap();
    assert!(second.allowed);
    assert_eq!(second.remaining, 0);

    let third = app
        .engine
        .check_and_consume_quota(&mgr, "X", Some(&scope))
        .await
        .unwrap();
    assert!(!third.allowed);
    assert_eq!(third.remaining, 0);

    let check = app.engine.check_quota(&mgr, "X", None).await.unwrap();
    assert!(!check.allowed);

    // Monday 2026-03-09 opens ISO week 11.
    app.clock.set(Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
    let next_week = app.engine.check_quota(&mgr, "X", None).await.unwrap();
    assert!(next_week.allowed);
    assert_eq!(next_week.remaining, 2);
    assert_eq!(next_week.period_key.as_deref(), Some("2026-W11"));
}

#[tokio::test]
async fn test_unlimited_when_nothing_governs() {
    let app = helpers::TestEngine::new();
    app.org_quota("Q1", "MGR", "ORG-1", Some("X"), PeriodType::Monthly, 1)
        .await;

    let other_category = app
        .engine
        .check_and_consume_quota(&UserId::from("MGR"), "Y", None)
        .await
        .unwrap();
    assert!(other_category.allowed);
    assert!(!other_category.is_limited());
    assert_eq!(other_category.message, "No matching quota rule");

    let no_quota = app
        .engine
        .check_quota(&UserId::from("NOBODY"), "X", None)
        .await
        .unwrap();
    assert!(no_quota.allowed);
    assert_eq!(no_quota.message, "No quota limit");
}

#[tokio::test]
async fn test_monthly_boundary() {
    let app = helpers::TestEngine::new();
    app.org_quota("Q1", "MGR", "ORG-1", None, PeriodType::Monthly, 1)
        .await;
    let mgr = UserId::from("MGR");

    app.clock.set(Utc.with_ymd_and_hms(2026, 1, 31, 23, 59, 0).unwrap());
    let january = app
        .engine
        .check_and_consume_quota(&mgr, "X", None)
        .await
        .unwrap();
    assert_eq!(january.period_key.as_deref(), Some("2026-01"));
    assert!(!app.engine.check_quota(&mgr, "X", None).await.unwrap().allowed);

    app.clock.advance(Duration::minutes(1));
    let february = app.engine.check_quota(&mgr, "X", None).await.unwrap();
    assert!(february.allowed);
    assert_eq!(february.period_key.as_deref(), Some("2026-02"));
}

#[tokio::test]
async fn test_period_follows_configured_wall_clock() {
    let app = helpers::TestEngine::with_config(EngineConfig {
        utc_offset_minutes: 9 * 60,
        ..EngineConfig::default()
    });
    app.org_quota("Q1", "MGR", "ORG-1", None, PeriodType::Daily, 3)
        .await;

    // 15:30 UTC is already the next day in UTC+9.
    app.clock.set(Utc.with_ymd_and_hms(2026, 3, 7, 15, 30, 0).unwrap());
    let check = app
        .engine
        .check_quota(&UserId::from("MGR"), "X", None)
        .await
        .unwrap();
    assert_eq!(check.period_key.as_deref(), Some("2026-03-08"));
}

#[tokio::test]
async fn test_summary_lists_every_active_quota() {
    let app = helpers::TestEngine::new();
    app.store.add_organization("ORG-1", "Engineering", None).await;
    app.org_quota("Q1", "MGR", "ORG-1", Some("X"), PeriodType::Yearly, 10)
        .await;
    app.org_quota("Q3", "OTHER", "ORG-GONE", None, PeriodType::Daily, 1)
        .await;

    app.engine
        .check_and_consume_quota(&UserId::from("MGR"), "X", None)
        .await
        .unwrap();

    let summary = app
        .engine
        .user_quota_summary(&UserId::from("MGR"))
        .await
        .unwrap();
    assert_eq!(summary.len(), 1);
    let q1 = &summary[0];
    assert_eq!(q1.scope_name, "Engineering");
    assert_eq!(q1.period_key, "2026");
    assert_eq!(q1.period_label, "year");
    assert_eq!(q1.used_count, 1);
    assert_eq!(q1.remaining_count, 9);

    let other = app
        .engine
        .user_quota_summary(&UserId::from("OTHER"))
        .await
        .unwrap();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].scope_name, "ORG-GONE");
}
