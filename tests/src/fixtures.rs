//! Test fixtures and event generators.

use chrono::{DateTime, Duration, TimeZone, Utc};
use engine_core::{Event, EventMetadata, EventType};

/// Fixed origin for fixture timestamps.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()
}

/// `secs` seconds after [`t0`].
pub fn at(secs: i64) -> DateTime<Utc> {
    t0() + Duration::seconds(secs)
}

/// An event of `event_type` in `session`.
pub fn event(session: &str, id: &str, event_type: impl Into<EventType>, secs: i64) -> Event {
    Event::new(id, session, event_type, at(secs))
}

/// A page view of `url`.
pub fn page(session: &str, id: &str, url: &str, secs: i64) -> Event {
    event(session, id, EventType::PageView, secs).with_url(url)
}

/// Parse metadata from a JSON literal.
pub fn meta(raw: &str) -> EventMetadata {
    EventMetadata::from_json(raw).unwrap()
}

/// Sets the IP address on every event.
pub fn from_ip(events: Vec<Event>, ip: &str) -> Vec<Event> {
    events.into_iter().map(|e| e.with_ip(ip)).collect()
}

/// Landing page, book-a-visit CTA, form start and a booked visit.
pub fn visit_booked(session: &str) -> Vec<Event> {
    vec![
        page(session, &format!("{session}-1"), "/", 0),
        event(session, &format!("{session}-2"), EventType::CtaClick, 40).with_intent("book_visit"),
        event(session, &format!("{session}-3"), EventType::FormStart, 50).with_intent("book_visit"),
        event(session, &format!("{session}-4"), EventType::FormSubmit, 120).with_intent("book_visit"),
    ]
}

/// A page view followed by a form start and nothing else.
pub fn early_abandon(session: &str) -> Vec<Event> {
    vec![
        page(session, &format!("{session}-1"), "/admissions", 0),
        event(session, &format!("{session}-2"), EventType::FormStart, 45).with_intent("enquire"),
    ]
}

/// Page views to A, B, A.
pub fn loop_a_b_a(session: &str) -> Vec<Event> {
    vec![
        page(session, &format!("{session}-1"), "/a", 0),
        page(session, &format!("{session}-2"), "/b", 20),
        page(session, &format!("{session}-3"), "/a", 40),
    ]
}

/// A form submit whose results page is a site search.
pub fn search_submit(session: &str) -> Vec<Event> {
    vec![
        page(session, &format!("{session}-1"), "/", 0),
        event(session, &format!("{session}-2"), EventType::FormSubmit, 30),
        event(session, &format!("{session}-3"), EventType::SiteSearch, 31),
        page(session, &format!("{session}-4"), "/?s=open+day", 32),
    ]
}

/// A human-looking browse with scrolling and heartbeats, offset by `start`.
pub fn browse(session: &str, start: i64) -> Vec<Event> {
    let id = |n: u32| format!("{session}-{n}");
    vec![
        page(session, &id(1), "/", start)
            .with_user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 Safari/605.1.15"),
        event(session, &id(2), EventType::ScrollDepth, start + 12).with_metadata(meta(r#"{"depth":50}"#)),
        event(session, &id(3), EventType::Heartbeat, start + 30),
        page(session, &id(4), "/about", start + 47),
        event(session, &id(5), EventType::CtaClick, start + 70).with_intent("prospectus"),
        event(session, &id(6), EventType::Heartbeat, start + 90),
    ]
}
