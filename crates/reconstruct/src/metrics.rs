//! Engagement metrics over a sorted session.

use std::collections::HashSet;

use engine_core::{EngagementMetrics, EventType, SessionThresholds};

use crate::sort::SortedEvents;

/// Computes scroll depth, dwell estimate, page and section counts.
///
/// Dwell is heartbeats times the heartbeat interval, an estimate rather than
/// a measured duration.
pub fn engagement_metrics(events: &SortedEvents, session: &SessionThresholds) -> EngagementMetrics {
    let mut max_scroll_pct: f64 = 0.0;
    let mut heartbeats: u32 = 0;
    let mut sections: u32 = 0;
    let mut pages: HashSet<&str> = HashSet::new();

    for e in events.iter() {
        match &e.event_type {
            EventType::ScrollDepth => {
                if let Some(depth) = e.metadata.depth {
                    max_scroll_pct = max_scroll_pct.max(depth.clamp(0.0, 100.0));
                }
            }
            EventType::Heartbeat => heartbeats = heartbeats.saturating_add(1),
            EventType::SectionView => sections = sections.saturating_add(1),
            EventType::PageView => {
                if let Some(url) = e.page_url.as_deref() {
                    pages.insert(url);
                }
            }
            _ => {}
        }
    }

    EngagementMetrics {
        max_scroll_pct,
        dwell_seconds: heartbeats.saturating_mul(session.heartbeat_interval_secs),
        unique_pages: pages.len() as u32,
        section_count: sections,
        total_events: events.len() as u32,
    }
}
