//! Friction signals: rage clicks, exit intent, confusion and revisit loops,
//! rapid navigation.

use std::collections::BTreeSet;

use engine_core::{
    EventType, Friction, FrictionKind, FrictionSignal, FrictionThresholds, LoopVisit, PageVisit,
    Severity,
};

use crate::sort::SortedEvents;

/// Derives the friction summary for one session.
///
/// `pages` and `loops` are the session's page sequence and revisit list.
pub fn detect_friction(
    events: &SortedEvents,
    pages: &[PageVisit],
    loops: &[LoopVisit],
    cfg: &FrictionThresholds,
) -> Friction {
    let mut signals = Vec::new();

    let mut rage_urls: Vec<String> = Vec::new();
    let mut rage_count: u32 = 0;
    let mut exit_count: u32 = 0;
    for e in events.iter() {
        match e.event_type {
            EventType::RageClick => {
                rage_count += 1;
                if let Some(url) = &e.page_url {
                    if !rage_urls.contains(url) {
                        rage_urls.push(url.clone());
                    }
                }
            }
            EventType::ExitIntent => exit_count += 1,
            _ => {}
        }
    }
    push(&mut signals, FrictionKind::RageClick, rage_count, rage_urls);
    push(&mut signals, FrictionKind::ExitIntent, exit_count, Vec::new());

    let confusion = confusion_loops(pages);
    push(&mut signals, FrictionKind::ConfusionLoop, confusion.len() as u32, confusion);

    push(
        &mut signals,
        FrictionKind::RevisitLoop,
        loops.len() as u32,
        loops.iter().map(|l| l.url.clone()).collect(),
    );

    let page_views: Vec<_> = events
        .iter()
        .filter(|e| e.event_type == EventType::PageView)
        .collect();
    let rapid = page_views
        .windows(2)
        .filter(|w| (w[1].at - w[0].at).num_milliseconds() < cfg.rapid_navigation_ms)
        .count();
    push(&mut signals, FrictionKind::RapidNavigation, rapid as u32, Vec::new());

    let categories = signals.len();
    let severity = match categories {
        n if n >= 3 => Severity::High,
        2 => Severity::Medium,
        _ => Severity::Low,
    };

    Friction {
        detected: categories >= 2 || rage_count > 0,
        signals,
        severity,
    }
}

fn push(signals: &mut Vec<FrictionSignal>, kind: FrictionKind, count: u32, urls: Vec<String>) {
    if count > 0 {
        signals.push(FrictionSignal { kind, count, urls });
    }
}

/// A→B→A triads, one per unordered page pair. Reports the page returned to.
fn confusion_loops(pages: &[PageVisit]) -> Vec<String> {
    let mut pairs: BTreeSet<(&str, &str)> = BTreeSet::new();
    let mut urls = Vec::new();

    for w in pages.windows(3) {
        let (a, b, back) = (w[0].url.as_str(), w[1].url.as_str(), w[2].url.as_str());
        if a != back || a == b {
            continue;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if pairs.insert(key) {
            urls.push(a.to_string());
        }
    }

    urls
}
