//! Reconstruction properties that must hold regardless of input order or
//! content: determinism, score bounds, outcome precedence, search
//! exclusion, and the honeypot override.

use engine_core::{BotType, Event, EventType, HeuristicsConfig, Outcome};
use integration_tests::fixtures::{
    browse, early_abandon, event, from_ip, loop_a_b_a, meta, page, search_submit, visit_booked,
};
use integration_tests::setup::TestContext;
use reconstruct::{reconstruct, JourneyContext, SortedEvents};

fn build(events: Vec<Event>) -> engine_core::Journey {
    let ctx = JourneyContext::new("j", 1);
    reconstruct(
        &SortedEvents::from_unordered(events),
        &ctx,
        &HeuristicsConfig::default(),
    )
    .unwrap()
}

fn sample_sessions() -> Vec<Vec<Event>> {
    let crawler: Vec<Event> = (0..12)
        .map(|n| {
            page("crawl", &format!("c{n}"), &format!("/page-{n:02}"), n)
                .with_user_agent("python-requests/2.31")
                .with_ip("3.5.140.2")
        })
        .collect();

    vec![
        visit_booked("s"),
        early_abandon("s"),
        loop_a_b_a("s"),
        search_submit("s"),
        from_ip(browse("s", 0), "198.51.100.20"),
        crawler,
    ]
}

#[test]
fn test_arrival_order_does_not_change_the_journey() {
    for events in sample_sessions() {
        let expected = build(events.clone());

        let mut reversed = events.clone();
        reversed.reverse();
        assert_eq!(build(reversed), expected);

        for shift in 1..events.len() {
            let mut rotated = events.clone();
            rotated.rotate_left(shift);
            assert_eq!(build(rotated), expected);
        }
    }
}

#[tokio::test]
async fn test_stored_order_does_not_change_the_rebuilt_journey() {
    let forward = TestContext::new(from_ip(browse("s", 0), "198.51.100.20"));
    let mut shuffled = from_ip(browse("s", 0), "198.51.100.20");
    shuffled.reverse();
    shuffled.swap(0, 2);
    let backward = TestContext::new(shuffled);

    forward.rebuild_worker().run_incremental(None).await.unwrap();
    backward.rebuild_worker().run_incremental(None).await.unwrap();

    assert_eq!(forward.store.journeys(), backward.store.journeys());
}

#[test]
fn test_scores_stay_within_bounds() {
    for events in sample_sessions() {
        let journey = build(events);
        assert!(journey.confidence <= 100);
        assert!(journey.bot_score <= 100);
        assert!(journey.check().is_ok());
    }
}

#[test]
fn test_submit_outranks_earlier_clicks() {
    let mut events = vec![
        page("s", "e1", "/", 0),
        event("s", "e2", EventType::CtaClick, 10).with_intent("prospectus"),
        event("s", "e3", EventType::CtaClick, 20).with_intent("book_visit"),
        event("s", "e4", EventType::FormSubmit, 90).with_intent("enquire"),
    ];
    // A click after the submit still does not demote it.
    events.push(event("s", "e5", EventType::CtaClick, 400).with_intent("apply"));

    let journey = build(events);
    assert_eq!(journey.outcome, Outcome::EnquirySubmitted);
}

#[test]
fn test_search_submit_is_not_an_enquiry() {
    let journey = build(search_submit("s"));
    assert_ne!(journey.outcome, Outcome::EnquirySubmitted);
    assert_eq!(journey.outcome, Outcome::NoAction);
}

#[test]
fn test_search_submit_falls_through_to_clicks() {
    let mut events = search_submit("s");
    events.push(event("s", "e9", EventType::CtaClick, 60).with_intent("book_visit"));

    let journey = build(events);
    assert_eq!(journey.outcome, Outcome::Engaged);
}

#[test]
fn test_honeypot_overrides_human_signals() {
    let mut events = from_ip(browse("s", 0), "198.51.100.20");
    events.push(
        event("s", "trap", EventType::CtaClick, 95)
            .with_ip("198.51.100.20")
            .with_metadata(meta(r#"{"honeypot_triggered":true}"#)),
    );

    let journey = build(events);
    assert!(journey.is_bot);
    assert_eq!(journey.bot_score, 100);
    assert_eq!(journey.bot_type, Some(BotType::Honeypot));
}

#[test]
fn test_honeypot_survives_a_mistyped_metadata_key() {
    let events = vec![
        page("s", "e1", "/", 0).with_user_agent(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/122.0 Safari/537.36",
        ),
        event("s", "trap", EventType::FormFieldBlur, 20)
            .with_metadata(meta(r#"{"honeypot_triggered":true,"field_name":5,"form_id":{"x":1}}"#)),
    ];

    let journey = build(events);
    assert_eq!(journey.bot_score, 100);
    assert_eq!(journey.bot_type, Some(BotType::Honeypot));
}

#[test]
fn test_known_crawler_user_agent() {
    let events = vec![page("s", "e1", "/", 0)
        .with_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)")];

    let journey = build(events);
    assert!(journey.is_bot);
    assert!(journey.bot_score >= 90);
    assert_eq!(journey.bot_type, Some(BotType::SearchEngine));
}
