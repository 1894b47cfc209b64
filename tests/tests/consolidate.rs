//! Full consolidation against the in-memory stores.

use std::sync::Arc;
use std::time::Duration;

use engine_core::{Event, EventType};
use integration_tests::fixtures::{at, browse, event, from_ip, page, visit_booked};
use integration_tests::setup::TestContext;
use worker::SchedulerConfig;

const IP: &str = "203.0.113.9";

/// Session "a" at t=0 and t=30s, then the client rotates to "b" at t=5min.
fn rotated_session() -> Vec<Event> {
    from_ip(
        vec![
            page("a", "a1", "/", 0),
            page("a", "a2", "/fees", 30),
            page("b", "b1", "/contact", 300),
        ],
        IP,
    )
}

#[tokio::test]
async fn test_splits_an_ip_on_the_session_gap() {
    let ctx = TestContext::new(from_ip(
        vec![
            page("a", "e1", "/", 0),
            page("a", "e2", "/fees", 600),
            page("b", "e3", "/", 2_700),
        ],
        IP,
    ));

    let summary = ctx.consolidation_worker().run(None).await.unwrap();

    assert_eq!(summary.ips_scanned, 1);
    assert_eq!(summary.sessions_built, 2);
    assert_eq!(summary.journeys_upserted, 2);

    let first = ctx.store.journey("a").unwrap();
    assert_eq!(first.visit_number, 1);
    assert_eq!(first.first_seen, at(0));
    assert_eq!(first.last_seen, at(600));

    let second = ctx.store.journey("b").unwrap();
    assert_eq!(second.visit_number, 2);
    assert_eq!(second.first_seen, at(2_700));
    assert_eq!(second.primary_ip_address.as_deref(), Some(IP));
}

#[tokio::test]
async fn test_folds_rotated_ids_and_deletes_duplicates() {
    let ctx = TestContext::new(rotated_session());
    ctx.seed_session_journey("a");
    ctx.seed_session_journey("b");
    assert_eq!(ctx.store.journey_ids(), vec!["a", "b"]);

    let summary = ctx.consolidation_worker().run(None).await.unwrap();

    assert_eq!(summary.sessions_built, 1);
    assert_eq!(summary.duplicates_deleted, 1);
    assert_eq!(ctx.store.journey_ids(), vec!["a"]);

    let merged = ctx.store.journey("a").unwrap();
    assert_eq!(merged.event_count, 3);
    assert_eq!(merged.page_sequence.len(), 3);
    assert_eq!(merged.last_seen, at(300));
}

#[tokio::test]
async fn test_deletes_journeys_without_any_ip() {
    let mut events = from_ip(visit_booked("known"), IP);
    events.extend(visit_booked("ghost"));
    let ctx = TestContext::new(events);
    ctx.rebuild_worker().run_incremental(None).await.unwrap();
    ctx.seed_session_journey("ghost");
    assert!(ctx.store.journey("ghost").is_some());

    let summary = ctx.consolidation_worker().run(None).await.unwrap();

    assert_eq!(summary.orphans_deleted, 1);
    assert_eq!(ctx.store.journey_ids(), vec!["known"]);
}

#[tokio::test]
async fn test_reused_id_after_gap_gets_visit_suffix() {
    let ctx = TestContext::new(from_ip(
        vec![page("a", "e1", "/", 0), page("a", "e2", "/", 7_200)],
        IP,
    ));

    let summary = ctx.consolidation_worker().run(None).await.unwrap();

    assert_eq!(summary.sessions_built, 2);
    assert_eq!(summary.duplicates_deleted, 0);
    assert_eq!(ctx.store.journey_ids(), vec!["a", "a-v2"]);
    assert_eq!(ctx.store.journey("a-v2").unwrap().visit_number, 2);
}

#[tokio::test]
async fn test_heartbeats_capped_per_elapsed_minute() {
    let mut events = vec![page("hb", "p1", "/", 0)];
    events.extend((1..=10).map(|n| event("hb", &format!("h{n}"), EventType::Heartbeat, n * 12)));
    let ctx = TestContext::new(from_ip(events, IP));

    ctx.consolidation_worker().run(None).await.unwrap();

    // 1 page view + min(10 heartbeats, ceil(120s / 60))
    assert_eq!(ctx.store.journey("hb").unwrap().event_count, 3);
}

#[tokio::test]
async fn test_failed_upsert_keeps_duplicates() {
    let ctx = TestContext::new(rotated_session());
    ctx.seed_session_journey("a");
    ctx.seed_session_journey("b");
    ctx.store.fail_upsert_for("a");

    let summary = ctx.consolidation_worker().run(None).await.unwrap();

    assert_eq!(summary.errors.len(), 1);
    assert_eq!(summary.errors[0].journey_id, "a");
    assert_eq!(summary.duplicates_deleted, 0);
    assert!(ctx.store.journey("b").is_some());
}

#[tokio::test]
async fn test_store_failure_aborts_consolidation() {
    let ctx = TestContext::new(rotated_session());
    ctx.store.set_fail_reads(true);

    let err = ctx.consolidation_worker().run(None).await.unwrap_err();

    assert_eq!(err.error_code(), Some("STORE_001"));
}

#[tokio::test]
async fn test_site_scope_limits_consolidation() {
    let mut events = from_ip(browse("sx", 0), IP)
        .into_iter()
        .map(|e| e.with_site("x"))
        .collect::<Vec<_>>();
    events.extend(
        from_ip(browse("sy", 10_000), IP)
            .into_iter()
            .map(|e| e.with_site("y")),
    );
    let ctx = TestContext::new(events);

    let summary = ctx.consolidation_worker().run(Some("x")).await.unwrap();

    assert_eq!(summary.sessions_built, 1);
    assert_eq!(ctx.store.journey_ids(), vec!["sx"]);
    assert_eq!(ctx.store.journey("sx").unwrap().site_id.as_deref(), Some("x"));
}

#[tokio::test]
async fn test_consolidation_is_idempotent() {
    let mut events = rotated_session();
    events.extend(from_ip(browse("c", 20_000), IP));
    let ctx = TestContext::new(events);
    let worker = ctx.consolidation_worker();

    worker.run(None).await.unwrap();
    let first = ctx.store.journeys();
    worker.run(None).await.unwrap();

    assert_eq!(first, ctx.store.journeys());
}

#[tokio::test]
async fn test_incremental_rebuild_keeps_consolidated_journeys() {
    let mut events = rotated_session();
    events.extend(from_ip(
        (1..=10)
            .map(|n| event("a", &format!("h{n}"), EventType::Heartbeat, n * 12))
            .collect(),
        IP,
    ));
    let ctx = TestContext::new(events);
    ctx.seed_session_journey("a");
    ctx.seed_session_journey("b");

    ctx.consolidation_worker().run(None).await.unwrap();
    let consolidated = ctx.store.journeys();
    assert_eq!(ctx.store.journey_ids(), vec!["a"]);

    let summary = ctx.rebuild_worker().run_incremental(None).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.updated, 1);
    assert!(summary.errors.is_empty());
    assert_eq!(ctx.store.journeys(), consolidated);
}

#[tokio::test]
async fn test_incremental_rebuild_claims_ids_like_a_full_run() {
    // "m" moves from the first IP to the second; "n" is a later visit on
    // the second IP and the only recent session.
    let mut events = from_ip(vec![page("m", "m1", "/", 0)], "203.0.113.1");
    events.extend(from_ip(
        vec![page("m", "m2", "/fees", 100), page("n", "n1", "/", 5_000)],
        "203.0.113.2",
    ));
    let ctx = TestContext::new(events);

    ctx.consolidation_worker().run(None).await.unwrap();
    let consolidated = ctx.store.journeys();
    assert_eq!(ctx.store.journey_ids(), vec!["m", "m-v1", "n"]);

    let summary = ctx
        .rebuild_worker()
        .run_incremental(Some(at(4_000)))
        .await
        .unwrap();

    assert_eq!(summary.processed, 1);
    assert_eq!(ctx.store.journeys(), consolidated);
}

#[tokio::test]
async fn test_consolidation_spans_many_ip_chunks() {
    let mut events = Vec::new();
    for n in 0..9 {
        let ip = format!("203.0.113.{}", 10 + n);
        events.extend(from_ip(vec![page(&format!("s{n}"), &format!("e{n}"), "/", n * 10)], &ip));
    }
    // the first and last IPs share a client session id, which opens the
    // last IP's only session
    events.push(page("s0", "moved", "/fees", 70).with_ip("203.0.113.18"));
    let ctx = TestContext::new(events);

    let summary = ctx.consolidation_worker().run(None).await.unwrap();

    assert_eq!(summary.ips_scanned, 9);
    assert_eq!(summary.sessions_built, 9);
    assert_eq!(summary.journeys_upserted, 9);
    assert_eq!(summary.duplicates_deleted, 1);
    assert!(ctx.store.journey("s0").is_some());
    assert!(ctx.store.journey("s0-v1").is_some());
    assert!(ctx.store.journey("s8").is_none());
}

#[tokio::test]
async fn test_trigger_runs_consolidation_in_the_background() {
    let mut events = from_ip(vec![page("a", "e1", "/", 0)], IP);
    events.extend(visit_booked("ghost"));
    let ctx = TestContext::new(events);
    ctx.seed_session_journey("ghost");
    let scheduler = Arc::new(ctx.scheduler(SchedulerConfig {
        rebuild_interval_secs: 3_600,
        lookback_hours: 0,
        ..Default::default()
    }));
    let trigger = scheduler.trigger();
    let handles = Arc::clone(&scheduler).start();

    trigger.fire();

    // only consolidation removes orphans
    let mut consolidated = false;
    for _ in 0..100 {
        if ctx.store.journey("ghost").is_none() {
            consolidated = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    for handle in handles {
        handle.abort();
    }
    assert!(consolidated, "consolidation never ran");
}
