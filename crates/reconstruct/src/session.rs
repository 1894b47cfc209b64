//! Time-gap session splitting and consolidation planning.
//!
//! The planner is the pure half of consolidation: given one IP's events it
//! walks them in time order, closes a session whenever the gap to the
//! previous event exceeds the threshold, and decides each session's journey
//! id and visit number. Fetching, upserting and deleting belong to the
//! caller.

use std::collections::{BTreeSet, HashSet};

use chrono::Duration;
use engine_core::{Event, EventType};
use tracing::debug;

use crate::sort::{SortedEvents, TimedEvent};

/// Splits a sorted run into sessions separated by gaps longer than
/// `gap_secs`. A gap exactly equal to the threshold does not split.
pub fn split_sessions(events: SortedEvents, gap_secs: i64) -> Vec<SortedEvents> {
    let gap = Duration::seconds(gap_secs);
    let mut sessions = Vec::new();
    let mut current: Vec<TimedEvent> = Vec::new();

    for event in events.into_inner() {
        if let Some(prev) = current.last() {
            if event.at - prev.at > gap {
                sessions.push(SortedEvents::from_sorted(std::mem::take(&mut current)));
            }
        }
        current.push(event);
    }
    if !current.is_empty() {
        sessions.push(SortedEvents::from_sorted(current));
    }

    sessions
}

/// Event count with heartbeats capped at one per elapsed minute.
pub fn meaningful_event_count(events: &SortedEvents) -> u32 {
    let heartbeats = events
        .iter()
        .filter(|e| e.event_type == EventType::Heartbeat)
        .count() as u64;
    let others = events.len() as u64 - heartbeats;

    let elapsed_secs = match (events.first_at(), events.last_at()) {
        (Some(first), Some(last)) => (last - first).num_seconds().max(0) as u64,
        _ => 0,
    };
    let allowed = elapsed_secs.div_ceil(60);

    (others + heartbeats.min(allowed)).min(u32::MAX as u64) as u32
}

/// One session planned for persistence.
#[derive(Debug, Clone)]
pub struct PlannedSession {
    pub journey_id: String,
    /// 1-based ordinal among this IP's sessions
    pub visit_number: u32,
    pub events: SortedEvents,
}

/// Plans consolidation across IPs within one run.
///
/// Tracks which journey ids the run has claimed, so a session whose first
/// event's id is already taken gets a suffixed id, and so claimed ids are
/// never reported as duplicates.
#[derive(Debug, Default)]
pub struct ConsolidationPlanner {
    claimed: HashSet<String>,
    seen: BTreeSet<String>,
}

impl ConsolidationPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits one IP's events into sessions and assigns their ids.
    pub fn plan_ip(&mut self, events: Vec<Event>, gap_secs: i64) -> Vec<PlannedSession> {
        let sorted = SortedEvents::from_unordered(events);
        for e in sorted.iter() {
            self.seen.insert(e.session_id.clone());
        }

        split_sessions(sorted, gap_secs)
            .into_iter()
            .enumerate()
            .filter_map(|(idx, events)| {
                let visit_number = idx as u32 + 1;
                let primary = events.first()?.session_id.clone();
                let journey_id = self.claim(&primary, visit_number);
                Some(PlannedSession {
                    journey_id,
                    visit_number,
                    events,
                })
            })
            .collect()
    }

    fn claim(&mut self, primary: &str, visit_number: u32) -> String {
        let mut candidate = primary.to_string();
        let mut attempt = 0;
        while self.claimed.contains(&candidate) {
            attempt += 1;
            candidate = if attempt == 1 {
                format!("{primary}-v{visit_number}")
            } else {
                format!("{primary}-v{visit_number}-{attempt}")
            };
        }
        if candidate != primary {
            debug!(journey_id = %primary, reassigned = %candidate, "Journey id already claimed");
        }
        self.claimed.insert(candidate.clone());
        candidate
    }

    /// Original journey ids folded into some session but not kept as a
    /// journey id, in sorted order.
    pub fn duplicates(&self) -> Vec<String> {
        self.seen
            .iter()
            .filter(|id| !self.claimed.contains(*id))
            .cloned()
            .collect()
    }

    /// Whether any planned session so far holds an event of `session_id`.
    pub fn has_seen(&self, session_id: &str) -> bool {
        self.seen.contains(session_id)
    }

    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }
}
