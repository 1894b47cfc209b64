//! Entry intent, outcome, and intent strength classification.
//!
//! Outcome rules run in fixed precedence (submit, abandoned start, click,
//! nothing) and each picks the last matching event of its kind. A submit
//! always beats a click, however far apart they are.

use engine_core::{
    ClassifierThresholds, EngagementMetrics, EventType, IntentStrength, IntentType, Outcome,
    OutcomeCause,
};

use crate::forms::classify_abandonment;
use crate::sort::{SortedEvents, TimedEvent};

/// Outcome plus the cause and intent behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeClass {
    pub outcome: Outcome,
    pub cause: OutcomeCause,
    pub intent_type: Option<IntentType>,
}

impl OutcomeClass {
    fn no_action() -> Self {
        Self {
            outcome: Outcome::NoAction,
            cause: OutcomeCause::None,
            intent_type: None,
        }
    }
}

/// Intent at entry.
///
/// A click with a known intent within the first few events overrides the
/// weaker keyword match on the first page view's URL.
pub fn initial_intent(events: &SortedEvents, cfg: &ClassifierThresholds) -> IntentType {
    let early_click = events
        .iter()
        .take(cfg.early_click_window)
        .filter(|e| e.event_type.is_click())
        .find_map(|e| e.intent_type.clone().filter(|i| !matches!(i, IntentType::Other(_))));
    if let Some(intent) = early_click {
        return intent;
    }

    events
        .iter()
        .find(|e| e.event_type == EventType::PageView)
        .and_then(|e| e.page_url.as_deref())
        .and_then(intent_from_url)
        .unwrap_or(IntentType::Browsing)
}

fn intent_from_url(url: &str) -> Option<IntentType> {
    let url = url.to_ascii_lowercase();
    if url.contains("admissions") {
        Some(IntentType::Admissions)
    } else if url.contains("visit") {
        Some(IntentType::BookVisit)
    } else if url.contains("prospectus") {
        Some(IntentType::Prospectus)
    } else if url.contains("contact") {
        Some(IntentType::Contact)
    } else {
        None
    }
}

/// Seconds from the first event to the first click or form action.
pub fn time_to_action(events: &SortedEvents) -> Option<i64> {
    let start = events.first_at()?;
    events
        .iter()
        .find(|e| e.event_type.is_action())
        .map(|e| (e.at - start).num_seconds())
}

/// Classifies the session outcome over the whole sorted list.
pub fn classify_outcome(events: &SortedEvents, cfg: &ClassifierThresholds) -> OutcomeClass {
    // 1. real submits
    let last_submit = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.event_type == EventType::FormSubmit)
        .filter(|(idx, _)| !is_search_submit(events, *idx, cfg))
        .map(|(_, e)| e)
        .last();
    if let Some(submit) = last_submit {
        let outcome = match submit.intent_type {
            Some(IntentType::BookVisit) => Outcome::VisitBooked,
            _ => Outcome::EnquirySubmitted,
        };
        return OutcomeClass {
            outcome,
            cause: OutcomeCause::FormSubmitted,
            intent_type: submit.intent_type.clone(),
        };
    }

    // 2. real starts without a submit
    let any_search = events.iter().any(|e| e.event_type == EventType::SiteSearch);
    if !any_search {
        let last_start = events
            .iter()
            .filter(|e| e.event_type == EventType::FormStart && !names_search_form(e))
            .last();
        if let Some(start) = last_start {
            return OutcomeClass {
                outcome: classify_abandonment(events, cfg),
                cause: OutcomeCause::FormAbandoned,
                intent_type: start.intent_type.clone(),
            };
        }
    }

    // 3. clicks
    let clicks = || events.iter().filter(|e| e.event_type.is_click());
    let high_intent = clicks()
        .filter(|e| e.intent_type.as_ref().is_some_and(IntentType::is_high_intent))
        .last();
    if let Some(click) = high_intent {
        return OutcomeClass {
            outcome: Outcome::Engaged,
            cause: OutcomeCause::ClickHighIntent,
            intent_type: click.intent_type.clone(),
        };
    }
    if let Some(click) = clicks().last() {
        return OutcomeClass {
            outcome: Outcome::Engaged,
            cause: OutcomeCause::ClickLowIntent,
            intent_type: click.intent_type.clone(),
        };
    }

    OutcomeClass::no_action()
}

/// A submit is a site search when a `site_search` lands within the
/// exclusion window, the next page view is a results page, or the form
/// itself is named as a search form.
fn is_search_submit(events: &SortedEvents, idx: usize, cfg: &ClassifierThresholds) -> bool {
    let submit = &events[idx];
    if names_search_form(submit) {
        return true;
    }

    let rest = &events[idx + 1..];
    let searched_right_after = rest
        .iter()
        .take_while(|e| (e.at - submit.at).num_milliseconds() <= cfg.search_exclusion_window_ms)
        .any(|e| e.event_type == EventType::SiteSearch);
    if searched_right_after {
        return true;
    }

    rest.iter()
        .find(|e| e.event_type == EventType::PageView)
        .and_then(|e| e.page_url.as_deref())
        .is_some_and(is_search_results_url)
}

fn is_search_results_url(url: &str) -> bool {
    let url = url.to_ascii_lowercase();
    url.contains("?s=") || url.contains("search")
}

fn names_search_form(e: &TimedEvent) -> bool {
    [e.metadata.form_id.as_deref(), e.metadata.form_label.as_deref()]
        .into_iter()
        .flatten()
        .any(|name| name.to_ascii_lowercase().contains("search"))
}

/// Scores how strongly the session expressed intent.
pub fn intent_strength(
    time_to_action: Option<i64>,
    metrics: &EngagementMetrics,
    cfg: &ClassifierThresholds,
) -> IntentStrength {
    let mut score: i32 = 0;

    score += match time_to_action {
        Some(secs) if secs < cfg.premature_action_secs => -2,
        Some(secs) if secs < cfg.considered_action_min_secs => 1,
        Some(secs) if secs <= cfg.considered_action_max_secs => 2,
        Some(_) => 1,
        None => 0,
    };

    score += cfg.strength_scroll_pct.points(metrics.max_scroll_pct);
    score += cfg.strength_sections.points(metrics.section_count as f64);
    score += cfg.strength_dwell_secs.points(metrics.dwell_seconds as f64);
    score += cfg.strength_pages.points(metrics.unique_pages as f64);
    if metrics.total_events >= cfg.strength_busy_events {
        score += 1;
    }

    if score >= cfg.strength_high {
        IntentStrength::High
    } else if score >= cfg.strength_medium {
        IntentStrength::Medium
    } else {
        IntentStrength::Low
    }
}
