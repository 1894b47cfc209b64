//! Depth-of-completion bucketing for forms started but never submitted.

use std::collections::BTreeSet;

use engine_core::{ClassifierThresholds, EventType, Outcome};

use crate::sort::SortedEvents;

/// Buckets an unsubmitted form into early, mid, or near-complete abandonment.
///
/// The last explicit `form_abandon` carrying `fields_completed` wins;
/// otherwise depth is inferred from `form_field_blur` events.
pub fn classify_abandonment(events: &SortedEvents, cfg: &ClassifierThresholds) -> Outcome {
    let explicit = events
        .iter()
        .rev()
        .filter(|e| e.event_type == EventType::FormAbandon)
        .find_map(|e| e.metadata.fields_completed);

    match explicit {
        Some(fields) => bucket_explicit(fields, cfg),
        None => infer_from_blurs(events, cfg),
    }
}

fn bucket_explicit(fields_completed: u32, cfg: &ClassifierThresholds) -> Outcome {
    if fields_completed >= cfg.abandon_near_complete_fields {
        Outcome::FormNearCompleteAbandon
    } else if fields_completed >= cfg.abandon_mid_fields {
        Outcome::FormMidAbandon
    } else {
        Outcome::FormEarlyAbandon
    }
}

fn infer_from_blurs(events: &SortedEvents, cfg: &ClassifierThresholds) -> Outcome {
    let mut touched: BTreeSet<&str> = BTreeSet::new();
    let mut completed: BTreeSet<&str> = BTreeSet::new();

    for e in events.iter().filter(|e| e.event_type == EventType::FormFieldBlur) {
        let Some(field) = e.metadata.field_name.as_deref().filter(|f| !f.is_empty()) else {
            continue;
        };
        touched.insert(field);
        if e.metadata.completed == Some(true) {
            completed.insert(field);
        }
    }

    if completed.len() >= cfg.inferred_near_complete_completed
        || touched.len() >= cfg.inferred_near_complete_touched
    {
        Outcome::FormNearCompleteAbandon
    } else if completed.len() >= cfg.inferred_mid_completed || touched.len() >= cfg.inferred_mid_touched {
        Outcome::FormMidAbandon
    } else {
        Outcome::FormEarlyAbandon
    }
}
