//! Incremental rebuild against the in-memory stores.

use engine_core::{EventType, FrictionKind, Outcome};
use integration_tests::fixtures::{
    at, browse, early_abandon, event, from_ip, loop_a_b_a, page, visit_booked,
};
use integration_tests::setup::TestContext;
use telemetry::health;
use worker::SchedulerConfig;

#[tokio::test]
async fn test_rebuild_builds_one_journey_per_session() {
    let mut events = from_ip(visit_booked("booked"), "198.51.100.1");
    events.extend(from_ip(early_abandon("abandoned"), "198.51.100.2"));
    events.extend(from_ip(loop_a_b_a("looped"), "198.51.100.3"));
    let ctx = TestContext::new(events);

    let summary = ctx.rebuild_worker().run_incremental(None).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.updated, 3);
    assert_eq!(summary.skipped, 0);
    assert!(summary.errors.is_empty());

    let booked = ctx.store.journey("booked").unwrap();
    assert_eq!(booked.outcome, Outcome::VisitBooked);
    assert_eq!(booked.visit_number, 1);

    let abandoned = ctx.store.journey("abandoned").unwrap();
    assert_eq!(abandoned.outcome, Outcome::FormEarlyAbandon);
    assert_eq!(abandoned.time_to_action, Some(45));

    let looped = ctx.store.journey("looped").unwrap();
    assert_eq!(looped.loops.len(), 1);
    assert_eq!(looped.loops[0].url, "/a");
    assert_eq!(looped.loops[0].visit_count, 2);
    assert!(looped.friction.has(FrictionKind::ConfusionLoop));
}

#[tokio::test]
async fn test_rebuild_twice_stores_identical_journeys() {
    let mut events = from_ip(visit_booked("a"), "198.51.100.7");
    events.extend(from_ip(browse("b", 600), "198.51.100.8"));
    let ctx = TestContext::new(events);
    let worker = ctx.rebuild_worker();

    worker.run_incremental(None).await.unwrap();
    let first = ctx.store.journeys();
    worker.run_incremental(None).await.unwrap();
    let second = ctx.store.journeys();

    assert_eq!(first, second);
    assert_eq!(ctx.store.upsert_count(), 4);
}

#[tokio::test]
async fn test_cutoff_limits_rebuilt_sessions() {
    let mut events = from_ip(visit_booked("early"), "198.51.100.1");
    events.extend(from_ip(browse("late", 7_200), "198.51.100.2"));
    let ctx = TestContext::new(events);

    let summary = ctx
        .rebuild_worker()
        .run_incremental(Some(at(3_600)))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(ctx.store.journey_ids(), vec!["late"]);
}

#[tokio::test]
async fn test_one_failed_journey_does_not_abort_the_batch() {
    let mut events = from_ip(visit_booked("s1"), "198.51.100.1");
    events.extend(from_ip(visit_booked("s2"), "198.51.100.2"));
    events.extend(from_ip(visit_booked("s3"), "198.51.100.3"));
    let ctx = TestContext::new(events);
    ctx.store.fail_upsert_for("s2");

    let summary = ctx.rebuild_worker().run_incremental(None).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.updated, 2);
    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].journey_id, "s2");
    assert!(summary.errors[0].reason.contains("STORE_002"));
    assert_eq!(ctx.store.journey_ids(), vec!["s1", "s3"]);
}

#[tokio::test]
async fn test_listing_failure_aborts_the_run() {
    let ctx = TestContext::new(from_ip(visit_booked("s1"), "198.51.100.1"));
    ctx.store.set_fail_reads(true);

    let err = ctx.rebuild_worker().run_incremental(None).await.unwrap_err();

    assert!(err.is_store());
    assert_eq!(err.error_code(), Some("STORE_001"));
    assert!(ctx.store.journeys().is_empty());
}

#[tokio::test]
async fn test_visit_number_is_the_session_ordinal_on_its_ip() {
    let mut events = from_ip(browse("first", 0), "198.51.100.1");
    events.extend(from_ip(browse("second", 86_400), "198.51.100.1"));
    events.extend(from_ip(browse("other", 43_200), "198.51.100.2"));
    let ctx = TestContext::new(events);

    // only "second" is recent, but its whole IP is re-planned
    let summary = ctx
        .rebuild_worker()
        .run_incremental(Some(at(86_000)))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.updated, 2);
    assert_eq!(ctx.store.journey_ids(), vec!["first", "second"]);
    assert_eq!(ctx.store.journey("first").unwrap().visit_number, 1);
    assert_eq!(ctx.store.journey("second").unwrap().visit_number, 2);

    ctx.rebuild_worker().run_incremental(None).await.unwrap();
    assert_eq!(ctx.store.journey("other").unwrap().visit_number, 1);
}

#[tokio::test]
async fn test_session_without_timestamps_is_skipped() {
    let mut undated = event("undated", "u1", EventType::PageView, 0).with_ip("198.51.100.9");
    undated.occurred_at = None;
    let dated = page("dated", "d1", "/", 10).with_ip("198.51.100.1");
    let ctx = TestContext::new(vec![undated, dated]);

    let summary = ctx.rebuild_worker().run_incremental(None).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 1);
    assert!(ctx.store.journey("undated").is_none());
}

#[tokio::test]
async fn test_session_without_ip_is_left_to_consolidation() {
    let mut events = visit_booked("anonymous");
    events.extend(from_ip(browse("known", 0), "198.51.100.1"));
    let ctx = TestContext::new(events);

    let summary = ctx.rebuild_worker().run_incremental(None).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(ctx.store.journey_ids(), vec!["known"]);
}

#[tokio::test]
async fn test_scheduler_tracks_health_across_runs() {
    let ctx = TestContext::new(from_ip(visit_booked("s1"), "198.51.100.1"));
    let scheduler = ctx.scheduler(SchedulerConfig {
        lookback_hours: 0,
        ..Default::default()
    });

    ctx.store.set_fail_reads(true);
    assert!(scheduler.run_rebuild().await.is_err());
    assert!(!health().scheduler.is_healthy());

    ctx.store.set_fail_reads(false);
    let summary = scheduler.run_rebuild().await.unwrap();
    assert_eq!(summary.updated, 1);
    assert!(health().scheduler.is_healthy());
}
