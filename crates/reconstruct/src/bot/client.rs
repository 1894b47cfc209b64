//! Subscores from client-reported automation and behaviour summaries.
//!
//! Each function returns a 0-100 subscore plus the signal tags that fired.
//! A missing summary is no evidence either way and scores 0.

use std::sync::LazyLock;

use engine_core::{
    BotThresholds, ChallengeResult, ClientIndicators, EventMetadata, FingerprintSummary,
    MouseSummary, ScrollSummary,
};
use regex::Regex;

static SOFTWARE_RENDERER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)swiftshader|llvmpipe|softpipe|software rasterizer|mesa offscreen")
        .expect("invalid renderer pattern")
});

/// Screen sizes typical of headless defaults.
const HEADLESS_SCREENS: &[(u32, u32)] = &[(800, 600), (1024, 768), (0, 0)];

/// Accumulates a clamped subscore and its signals.
#[derive(Debug, Default)]
pub(crate) struct Subscore {
    score: u32,
    signals: Vec<String>,
}

impl Subscore {
    pub(crate) fn bump(&mut self, tag: &str, points: u32) {
        self.score = (self.score + points).min(100);
        self.signals.push(tag.to_string());
    }

    pub(crate) fn score(&self) -> u8 {
        self.score as u8
    }

    pub(crate) fn into_parts(self) -> (u8, Vec<String>) {
        (self.score as u8, self.signals)
    }
}

pub(crate) fn client_indicators(ci: &ClientIndicators) -> Subscore {
    let mut s = Subscore::default();
    if ci.webdriver == Some(true) {
        s.bump("webdriver", 60);
    }
    if !ci.automation_globals.is_empty() {
        s.bump("automation_globals", 60);
    }
    if ci.plugins_count == Some(0) {
        s.bump("no_plugins", 15);
    }
    if ci.languages_count == Some(0) {
        s.bump("no_languages", 15);
    }
    if ci.permissions_mismatch == Some(true) {
        s.bump("permissions_mismatch", 20);
    }
    s
}

pub(crate) fn fingerprint(fp: &FingerprintSummary) -> Subscore {
    let mut s = Subscore::default();
    if fp.canvas_suspicious == Some(true) {
        s.bump("canvas_suspicious", 30);
    } else if fp.canvas_hash.as_deref().map_or(true, str::is_empty) {
        s.bump("canvas_missing", 15);
    }
    match fp.webgl_renderer.as_deref() {
        Some(r) if SOFTWARE_RENDERER.is_match(r) => s.bump("software_renderer", 35),
        Some(r) if !r.is_empty() => {}
        _ => s.bump("webgl_missing", 10),
    }
    if fp.webgl_suspicious == Some(true) {
        s.bump("webgl_suspicious", 30);
    }
    if let (Some(w), Some(h)) = (fp.screen_width, fp.screen_height) {
        if HEADLESS_SCREENS.contains(&(w, h)) {
            s.bump("suspicious_resolution", 25);
        }
    }
    s
}

pub(crate) fn mouse(m: &MouseSummary) -> Subscore {
    let mut s = Subscore::default();
    if m.movement_count == Some(0) {
        s.bump("no_mouse_movement", 60);
        return s;
    }
    if m.straight_line_ratio.is_some_and(|r| r > 0.9) {
        s.bump("straight_mouse_lines", 30);
    }
    if m.timing_stddev_ms.is_some_and(|sd| sd < 5.0) {
        s.bump("uniform_mouse_timing", 25);
    }
    if m.teleport_count.is_some_and(|t| t > 3) {
        s.bump("mouse_teleport", 25);
    }
    s
}

pub(crate) fn scroll(sc: &ScrollSummary) -> Subscore {
    let mut s = Subscore::default();
    if sc.scroll_count == Some(0) {
        s.bump("no_scroll_activity", 40);
        return s;
    }
    if sc.timing_stddev_ms.is_some_and(|sd| sd < 5.0) {
        s.bump("uniform_scroll_timing", 25);
    }
    if sc.direction_changes == Some(0) && sc.scroll_count.is_some_and(|c| c > 5) {
        s.bump("single_direction_scroll", 20);
    }
    if sc.max_speed_px_per_sec.is_some_and(|v| v > 10_000.0) {
        s.bump("excessive_scroll_speed", 25);
    }
    s
}

pub(crate) fn challenge(c: &ChallengeResult) -> Subscore {
    let mut s = Subscore::default();
    if c.passed == Some(false) {
        s.bump("challenge_failed", 80);
    }
    if c.solve_time_ms.is_some_and(|t| t < 10.0) {
        s.bump("challenge_too_fast", 30);
    }
    s
}

/// Weighted client-side signals of one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientSignals {
    /// Weighted sum of the subscores, in points
    pub weighted: f64,
    /// Sum of the weights that applied
    pub weight: f64,
    pub signals: Vec<String>,
}

impl ClientSignals {
    /// Weighted average on a 0-100 scale.
    pub fn normalized(&self) -> f64 {
        if self.weight > 0.0 {
            (self.weighted / self.weight).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}

/// Combines every client summary present in `metadata`.
pub fn client_signals(metadata: &EventMetadata, cfg: &BotThresholds) -> ClientSignals {
    let w = &cfg.event_weights;
    let parts = [
        (metadata.client_indicators.as_ref().map(client_indicators), w.client_indicators),
        (metadata.fingerprint.as_ref().map(fingerprint), w.fingerprint),
        (metadata.mouse.as_ref().map(mouse), w.mouse),
        (metadata.scroll.as_ref().map(scroll), w.scroll),
        (metadata.challenge.as_ref().map(challenge), w.challenge),
    ];

    let mut out = ClientSignals::default();
    for (sub, weight) in parts {
        let Some(sub) = sub else { continue };
        out.weighted += sub.score() as f64 * weight;
        out.weight += weight;
        out.signals.extend(sub.into_parts().1);
    }
    out
}
