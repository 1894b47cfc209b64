//! Bot detection: per-event and per-journey classifiers.
//!
//! Signal families are weighted independently so one noisy signal cannot
//! flip the verdict, while deterministic proof (a known bot user agent, a
//! honeypot hit) short-circuits to a maximal score.

pub mod behaviour;
pub mod client;
pub mod network;
pub mod user_agent;

use engine_core::{BotThresholds, BotType, Event, EventType};

use crate::sort::SortedEvents;

pub use behaviour::analyze_behaviour;
pub use client::{client_signals, ClientSignals};
pub use network::is_datacenter_ip;
pub use user_agent::{analyze_user_agent, UaAnalysis, UaMatch};

/// Bot classification of an event or journey.
#[derive(Debug, Clone, PartialEq)]
pub struct BotVerdict {
    pub is_bot: bool,
    pub bot_score: u8,
    pub bot_type: Option<BotType>,
    pub signals: Vec<String>,
}

impl BotVerdict {
    /// No evidence at all.
    pub fn human() -> Self {
        Self {
            is_bot: false,
            bot_score: 0,
            bot_type: None,
            signals: Vec::new(),
        }
    }

    fn honeypot() -> Self {
        Self {
            is_bot: true,
            bot_score: 100,
            bot_type: Some(BotType::Honeypot),
            signals: vec!["honeypot_triggered".to_string()],
        }
    }

    /// Applies the good-crawler floor and the `is_bot` rule.
    fn finish(score: f64, ua: Option<UaMatch>, signals: Vec<String>, cfg: &BotThresholds) -> Self {
        let mut bot_score = score.round().clamp(0.0, 100.0) as u8;
        if let Some(m) = ua.filter(|m| m.bot_type.is_known_good()) {
            bot_score = bot_score.max(cfg.known_crawler_floor).max(m.confidence.min(100));
        }

        let ua_override = ua.is_some_and(|m| m.confidence >= cfg.ua_confidence_override);
        let is_bot = bot_score >= cfg.is_bot_score || ua_override;
        let bot_type = match ua {
            Some(m) => Some(m.bot_type),
            None if is_bot => Some(BotType::Suspicious),
            None => None,
        };

        Self {
            is_bot,
            bot_score,
            bot_type,
            signals,
        }
    }
}

fn honeypot_hit(event: &Event) -> bool {
    event.metadata.honeypot_triggered == Some(true)
}

/// Scores a single event, as used for pixel-only captures.
pub fn score_event(event: &Event, cfg: &BotThresholds) -> BotVerdict {
    if honeypot_hit(event) {
        return BotVerdict::honeypot();
    }

    let ua = analyze_user_agent(event.user_agent.as_deref());
    if let Some(m) = ua.matched {
        return BotVerdict::finish(m.confidence as f64, Some(m), ua.signals, cfg);
    }

    let w = &cfg.event_weights;
    let mut signals = ua.signals;
    let mut score = ua.score as f64 * w.user_agent;

    if event.ip_address.as_deref().is_some_and(is_datacenter_ip) {
        score += w.datacenter_points;
        signals.push("datacenter_ip".to_string());
    }

    let client = client_signals(&event.metadata, cfg);
    score += client.weighted;
    signals.extend(client.signals);

    BotVerdict::finish(score, None, signals, cfg)
}

/// Scores a reconstructed session.
///
/// Blends first-event user agent and IP, whole-session behaviour, and the
/// client summaries of the first event that carries any. Sessions made only
/// of pixel captures take the strongest per-event verdict instead.
pub fn score_journey(events: &SortedEvents, cfg: &BotThresholds) -> BotVerdict {
    let Some(first) = events.first() else {
        return BotVerdict::human();
    };
    if events.iter().any(|e| honeypot_hit(e)) {
        return BotVerdict::honeypot();
    }

    if events.iter().all(|e| e.event_type == EventType::PixelView) {
        return strongest_event_verdict(events, cfg);
    }

    let w = &cfg.journey_weights;
    let ua = analyze_user_agent(first.user_agent.as_deref());
    let mut signals = ua.signals.clone();

    let mut ua_ip = ua.score as f64;
    if first.ip_address.as_deref().is_some_and(is_datacenter_ip) {
        ua_ip += cfg.event_weights.datacenter_points;
        signals.push("datacenter_ip".to_string());
    }

    let (behaviour, behaviour_signals) = analyze_behaviour(events, cfg);
    signals.extend(behaviour_signals);

    let client = events
        .iter()
        .find(|e| e.metadata.has_client_signals())
        .map(|e| client_signals(&e.metadata, cfg))
        .unwrap_or_default();
    signals.extend(client.signals.iter().cloned());

    let score = ua_ip.min(100.0) * w.user_agent_ip
        + behaviour as f64 * w.behaviour
        + client.normalized() * w.client_indicators;

    BotVerdict::finish(score, ua.matched, signals, cfg)
}

/// Highest-scoring per-event verdict; the earliest wins a tie.
fn strongest_event_verdict(events: &SortedEvents, cfg: &BotThresholds) -> BotVerdict {
    events
        .iter()
        .map(|e| score_event(e, cfg))
        .fold(None::<BotVerdict>, |best, v| match best {
            Some(b) if b.bot_score >= v.bot_score => Some(b),
            _ => Some(v),
        })
        .unwrap_or_else(BotVerdict::human)
}
