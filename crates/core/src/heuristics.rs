//! Tunable thresholds for journey reconstruction and bot scoring.
//!
//! Every constant the heuristics depend on lives here so tests can hit
//! boundary values exactly and deployments can recalibrate without a
//! rebuild. Bot weights in particular are empirical and expected to move.

use serde::{Deserialize, Serialize};

/// Top-level heuristics configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    pub session: SessionThresholds,
    pub classifier: ClassifierThresholds,
    pub friction: FrictionThresholds,
    pub bot: BotThresholds,
}

/// Session splitting and heartbeat accounting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionThresholds {
    /// Gap that closes a session (seconds, strictly exceeded)
    pub gap_secs: i64,
    /// Client heartbeat interval (seconds)
    pub heartbeat_interval_secs: u32,
}

impl Default for SessionThresholds {
    fn default() -> Self {
        Self {
            gap_secs: 30 * 60,
            heartbeat_interval_secs: 30,
        }
    }
}

/// Intent and outcome classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// A submit followed by `site_search` within this window is a search (ms)
    pub search_exclusion_window_ms: i64,
    /// Clicks within the first N events override URL-derived intent
    pub early_click_window: usize,
    /// Actions sooner than this are premature (seconds)
    pub premature_action_secs: i64,
    /// Considered-action window (seconds)
    pub considered_action_min_secs: i64,
    pub considered_action_max_secs: i64,
    pub strength_high: i32,
    pub strength_medium: i32,
    /// Intent-strength points from scroll depth (percent)
    pub strength_scroll_pct: StrengthStep,
    /// Intent-strength points from sections viewed
    pub strength_sections: StrengthStep,
    /// Intent-strength points from dwell time (seconds)
    pub strength_dwell_secs: StrengthStep,
    /// Intent-strength points from unique pages
    pub strength_pages: StrengthStep,
    /// Sessions with at least this many events earn one more point
    pub strength_busy_events: u32,
    /// Explicit abandon: fields completed for near-complete / mid
    pub abandon_near_complete_fields: u32,
    pub abandon_mid_fields: u32,
    /// Inferred abandon: completed or touched field counts
    pub inferred_near_complete_completed: usize,
    pub inferred_near_complete_touched: usize,
    pub inferred_mid_completed: usize,
    pub inferred_mid_touched: usize,
    pub confidence: ConfidenceTiers,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            search_exclusion_window_ms: 2_000,
            early_click_window: 5,
            premature_action_secs: 10,
            considered_action_min_secs: 30,
            considered_action_max_secs: 300,
            strength_high: 7,
            strength_medium: 3,
            strength_scroll_pct: StrengthStep::new(75.0, 50.0),
            strength_sections: StrengthStep::new(3.0, 1.0),
            strength_dwell_secs: StrengthStep::new(180.0, 60.0),
            strength_pages: StrengthStep::new(4.0, 2.0),
            strength_busy_events: 15,
            abandon_near_complete_fields: 5,
            abandon_mid_fields: 2,
            inferred_near_complete_completed: 5,
            inferred_near_complete_touched: 8,
            inferred_mid_completed: 2,
            inferred_mid_touched: 3,
            confidence: ConfidenceTiers::default(),
        }
    }
}

/// Two-level intent-strength bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthStep {
    pub high: f64,
    pub low: f64,
}

impl StrengthStep {
    pub const fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    /// 2 at or above `high`, 1 at or above `low`, else 0.
    pub fn points(&self, value: f64) -> i32 {
        if value >= self.high {
            2
        } else if value >= self.low {
            1
        } else {
            0
        }
    }
}

/// Ascending thresholds and the points earned at each tier.
///
/// `points[0]` applies to any non-zero value below the first threshold;
/// `points[n]` once `n` thresholds are reached. A zero value earns nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tiers {
    pub thresholds: Vec<f64>,
    pub points: Vec<u8>,
}

impl Tiers {
    pub fn new(thresholds: &[f64], points: &[u8]) -> Self {
        Self {
            thresholds: thresholds.to_vec(),
            points: points.to_vec(),
        }
    }

    pub fn award(&self, value: f64) -> u8 {
        if value <= 0.0 {
            return 0;
        }
        let reached = self.thresholds.iter().filter(|t| value >= **t).count();
        self.points
            .get(reached)
            .or(self.points.last())
            .copied()
            .unwrap_or(0)
    }
}

/// Confidence score tiers per engagement dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceTiers {
    pub events: Tiers,
    pub dwell_secs: Tiers,
    pub scroll_pct: Tiers,
    pub pages: Tiers,
    pub sections: Tiers,
}

impl Default for ConfidenceTiers {
    fn default() -> Self {
        Self {
            events: Tiers::new(&[5.0, 10.0, 20.0], &[5, 15, 20, 25]),
            dwell_secs: Tiers::new(&[30.0, 60.0, 180.0], &[5, 10, 15, 25]),
            scroll_pct: Tiers::new(&[25.0, 50.0, 75.0], &[5, 10, 15, 20]),
            pages: Tiers::new(&[2.0, 4.0], &[5, 10, 15]),
            sections: Tiers::new(&[1.0, 2.0], &[5, 10, 15]),
        }
    }
}

/// Friction detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrictionThresholds {
    /// Consecutive page views closer than this are rapid navigation (ms)
    pub rapid_navigation_ms: i64,
}

impl Default for FrictionThresholds {
    fn default() -> Self {
        Self {
            rapid_navigation_ms: 5_000,
        }
    }
}

/// Per-event signal weights (fractions of a 0-100 subscore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventWeights {
    pub user_agent: f64,
    pub client_indicators: f64,
    pub fingerprint: f64,
    pub mouse: f64,
    pub scroll: f64,
    pub challenge: f64,
    /// Flat points added for a datacenter IP
    pub datacenter_points: f64,
}

impl Default for EventWeights {
    fn default() -> Self {
        Self {
            user_agent: 0.25,
            client_indicators: 0.15,
            fingerprint: 0.15,
            mouse: 0.15,
            scroll: 0.10,
            challenge: 0.10,
            datacenter_points: 10.0,
        }
    }
}

/// Per-journey blend weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JourneyWeights {
    pub user_agent_ip: f64,
    pub behaviour: f64,
    pub client_indicators: f64,
}

impl Default for JourneyWeights {
    fn default() -> Self {
        Self {
            user_agent_ip: 0.30,
            behaviour: 0.50,
            client_indicators: 0.20,
        }
    }
}

/// Bot detection thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotThresholds {
    pub event_weights: EventWeights,
    pub journey_weights: JourneyWeights,
    /// Aggregate score at or above which a journey is a bot
    pub is_bot_score: u8,
    /// UA match confidence that alone makes a bot
    pub ua_confidence_override: u8,
    /// Minimum score for identified good crawlers
    pub known_crawler_floor: u8,
    /// Page views closer than this are impossible for a human (ms)
    pub impossible_navigation_ms: i64,
    /// Page views closer than this are suspiciously fast (ms)
    pub fast_navigation_ms: i64,
    /// Pages per minute above which the session looks like a crawl
    pub crawl_pages_per_minute: f64,
    /// Minimum page views before rate and sequence checks apply
    pub min_pages_for_crawl: usize,
    /// Inter-event timing coefficient of variation below which timing is uniform
    pub uniform_timing_cv: f64,
    /// Minimum intervals before uniform timing is judged
    pub min_intervals_for_timing: usize,
    /// Sessions longer than this without a heartbeat are suspicious (seconds)
    pub heartbeat_expected_after_secs: i64,
    /// Sessions shorter than this with no engagement are suspicious (seconds)
    pub short_session_secs: i64,
}

impl Default for BotThresholds {
    fn default() -> Self {
        Self {
            event_weights: EventWeights::default(),
            journey_weights: JourneyWeights::default(),
            is_bot_score: 50,
            ua_confidence_override: 90,
            known_crawler_floor: 90,
            impossible_navigation_ms: 100,
            fast_navigation_ms: 500,
            crawl_pages_per_minute: 10.0,
            min_pages_for_crawl: 4,
            uniform_timing_cv: 0.10,
            min_intervals_for_timing: 5,
            heartbeat_expected_after_secs: 120,
            short_session_secs: 5,
        }
    }
}
