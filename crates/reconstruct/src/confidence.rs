//! Reliability score for a journey's classification.

use engine_core::{ConfidenceTiers, EngagementMetrics};

/// Additive 0-100 score rewarding more data and deeper engagement.
///
/// `event_count` is the journey's recorded event count, which may be the
/// heartbeat-capped count rather than `metrics.total_events`.
pub fn confidence_score(event_count: u32, metrics: &EngagementMetrics, tiers: &ConfidenceTiers) -> u8 {
    let total = tiers.events.award(event_count as f64) as u32
        + tiers.dwell_secs.award(metrics.dwell_seconds as f64) as u32
        + tiers.scroll_pct.award(metrics.max_scroll_pct) as u32
        + tiers.pages.award(metrics.unique_pages as f64) as u32
        + tiers.sections.award(metrics.section_count as f64) as u32;
    total.min(100) as u8
}
