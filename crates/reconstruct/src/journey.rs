//! Assembles every derived facet into one Journey record.

use engine_core::{Event, EventType, HeuristicsConfig, Journey, OutcomeDetail};

use crate::bot::score_journey;
use crate::classify::{classify_outcome, initial_intent, intent_strength, time_to_action};
use crate::confidence::confidence_score;
use crate::friction::detect_friction;
use crate::metrics::engagement_metrics;
use crate::sequence::{detect_loops, page_sequence};
use crate::session::meaningful_event_count;
use crate::sort::SortedEvents;

/// Identity and numbering for the journey being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JourneyContext {
    pub journey_id: String,
    pub visit_number: u32,
    /// Cap heartbeats at one per elapsed minute in `event_count`
    pub cap_heartbeats: bool,
}

impl JourneyContext {
    pub fn new(journey_id: impl Into<String>, visit_number: u32) -> Self {
        Self {
            journey_id: journey_id.into(),
            visit_number: visit_number.max(1),
            cap_heartbeats: false,
        }
    }

    pub fn with_heartbeat_cap(mut self) -> Self {
        self.cap_heartbeats = true;
        self
    }
}

/// Reconstructs one journey from its sorted events.
///
/// A pure function of `events`, `ctx` and `config`. Returns `None` when
/// there is nothing to reconstruct.
pub fn reconstruct(
    events: &SortedEvents,
    ctx: &JourneyContext,
    config: &HeuristicsConfig,
) -> Option<Journey> {
    let first = events.first()?;
    let last = events.last()?;

    let pages = page_sequence(events);
    let loops = detect_loops(&pages);
    let metrics = engagement_metrics(events, &config.session);
    let friction = detect_friction(events, &pages, &loops, &config.friction);

    let tta = time_to_action(events);
    let outcome = classify_outcome(events, &config.classifier);
    let strength = intent_strength(tta, &metrics, &config.classifier);

    let event_count = if ctx.cap_heartbeats {
        meaningful_event_count(events)
    } else {
        metrics.total_events
    };
    let confidence = confidence_score(event_count, &metrics, &config.classifier.confidence);
    let bot = score_journey(events, &config.bot);

    let entry = events.iter().find(|e| e.event_type == EventType::PageView);
    let entry_page = entry
        .and_then(|e| e.page_url.clone())
        .or_else(|| first.page_url.clone());
    let entry_referrer = entry
        .and_then(|e| e.referrer.clone())
        .or_else(|| first.referrer.clone());

    Some(Journey {
        journey_id: ctx.journey_id.clone(),
        visitor_id: first_present(events, |e| e.visitor_id.as_ref()),
        visit_number: ctx.visit_number.max(1),
        first_seen: first.at,
        last_seen: last.at,
        entry_page,
        entry_referrer,
        initial_intent: initial_intent(events, &config.classifier),
        page_sequence: pages,
        event_count,
        outcome: outcome.outcome,
        outcome_detail: OutcomeDetail {
            cause: outcome.cause,
            intent_type: outcome.intent_type,
            strength,
        },
        time_to_action: tta,
        loops,
        friction,
        confidence,
        engagement_metrics: metrics,
        is_bot: bot.is_bot,
        bot_score: bot.bot_score,
        bot_type: bot.bot_type,
        bot_signals: bot.signals,
        site_id: first_present(events, |e| e.site_id.as_ref()),
        primary_ip_address: first_present(events, |e| e.ip_address.as_ref()),
    })
}

/// First non-blank value of a field across the session.
fn first_present<'a>(
    events: &'a SortedEvents,
    pick: impl Fn(&'a Event) -> Option<&'a String>,
) -> Option<String> {
    events
        .iter()
        .find_map(|e| pick(&e.event).filter(|v| !v.trim().is_empty()).cloned())
}
