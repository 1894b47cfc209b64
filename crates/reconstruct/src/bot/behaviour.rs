//! Session-level behavioural analysis for bot scoring.

use engine_core::{BotThresholds, EventType};
use url::Url;

use super::client::Subscore;
use crate::sort::SortedEvents;

/// Scores how machine-like a whole session looks, 0-100.
pub fn analyze_behaviour(events: &SortedEvents, cfg: &BotThresholds) -> (u8, Vec<String>) {
    let mut s = Subscore::default();
    let (Some(first), Some(last)) = (events.first_at(), events.last_at()) else {
        return s.into_parts();
    };
    let duration_ms = (last - first).num_milliseconds();

    let pages: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::PageView)
        .collect();
    let scrolled = events.iter().any(|e| e.event_type == EventType::ScrollDepth);
    let clicked = events.iter().any(|e| e.event_type.is_click());
    let heartbeats = events.iter().any(|e| e.event_type == EventType::Heartbeat);
    let engaged = scrolled
        || heartbeats
        || events
            .iter()
            .any(|e| e.event_type.is_action() || e.event_type == EventType::SectionView);

    if events.len() == 1 {
        s.bump("single_event", 15);
    } else if duration_ms < cfg.short_session_secs * 1000 && !engaged {
        s.bump("short_session_no_engagement", 20);
    }

    if pages.len() >= 3 && !scrolled {
        s.bump("no_scroll", 15);
    }
    if pages.len() >= 3 && !clicked {
        s.bump("no_clicks", 10);
    }

    let fastest_nav = pages
        .windows(2)
        .map(|w| (w[1].at - w[0].at).num_milliseconds())
        .min();
    match fastest_nav {
        Some(gap) if gap < cfg.impossible_navigation_ms => s.bump("impossible_navigation_speed", 25),
        Some(gap) if gap < cfg.fast_navigation_ms => s.bump("fast_navigation", 15),
        _ => {}
    }

    if pages.len() >= cfg.min_pages_for_crawl {
        let paths: Vec<String> = pages
            .iter()
            .filter_map(|e| e.page_url.as_deref().map(url_path))
            .collect();
        if is_sequential_crawl(&paths) {
            s.bump("sequential_crawl", 20);
        }

        let minutes = duration_ms as f64 / 60_000.0;
        if minutes <= 0.0 || pages.len() as f64 / minutes > cfg.crawl_pages_per_minute {
            s.bump("crawl_rate", 20);
        }
    }

    if duration_ms > cfg.heartbeat_expected_after_secs * 1000 && !heartbeats {
        s.bump("no_heartbeats", 15);
    }

    // Heartbeats and scroll milestones fire on client timers, not visitor
    // actions.
    let paced: Vec<_> = events
        .iter()
        .filter(|e| !matches!(e.event_type, EventType::Heartbeat | EventType::ScrollDepth))
        .collect();
    let intervals: Vec<f64> = paced
        .windows(2)
        .map(|w| (w[1].at - w[0].at).num_milliseconds() as f64)
        .collect();
    if intervals.len() >= cfg.min_intervals_for_timing {
        let (mean, cv) = mean_and_cv(&intervals);
        if mean > 0.0 && cv < cfg.uniform_timing_cv {
            s.bump("uniform_timing", 20);
        }
    }

    s.into_parts()
}

/// Mean and coefficient of variation.
fn mean_and_cv(vals: &[f64]) -> (f64, f64) {
    if vals.is_empty() {
        return (0.0, 0.0);
    }
    let mean = vals.iter().sum::<f64>() / vals.len() as f64;
    if mean == 0.0 {
        return (0.0, 0.0);
    }
    let var = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vals.len() as f64;
    (mean, var.sqrt() / mean)
}

/// Lowercased path of an absolute or site-relative URL.
fn url_path(raw: &str) -> String {
    let parsed = Url::parse(raw).or_else(|_| {
        Url::parse("http://localhost/").and_then(|base| base.join(raw))
    });
    match parsed {
        Ok(url) => url.path().to_ascii_lowercase(),
        Err(_) => raw.to_ascii_lowercase(),
    }
}

/// Distinct paths visited in strictly ascending order, either alphabetically
/// or as a counted sequence (`/page/1`, `/page/2`, ...).
fn is_sequential_crawl(paths: &[String]) -> bool {
    if paths.len() < 2 {
        return false;
    }
    let alphabetical = paths.windows(2).all(|w| w[0] < w[1]);
    alphabetical || is_numbered_sequence(paths)
}

fn is_numbered_sequence(paths: &[String]) -> bool {
    let split: Option<Vec<(&str, u64)>> = paths
        .iter()
        .map(|p| {
            let trimmed = p.trim_end_matches('/');
            let digits = trimmed.len() - trimmed.trim_end_matches(|c: char| c.is_ascii_digit()).len();
            if digits == 0 {
                return None;
            }
            let (prefix, number) = trimmed.split_at(trimmed.len() - digits);
            number.parse().ok().map(|n| (prefix, n))
        })
        .collect();

    split.is_some_and(|parts| {
        parts
            .windows(2)
            .all(|w| w[0].0 == w[1].0 && w[1].1 == w[0].1 + 1)
    })
}
