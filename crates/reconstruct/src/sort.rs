//! Chronological ordering of a session's events.
//!
//! Every derivation step takes [`SortedEvents`], so no facet can be
//! computed over an unordered batch.

use std::ops::Deref;

use chrono::{DateTime, Utc};
use engine_core::Event;
use tracing::debug;

/// An event with its (known) timestamp lifted out.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub at: DateTime<Utc>,
    pub event: Event,
}

impl Deref for TimedEvent {
    type Target = Event;

    fn deref(&self) -> &Event {
        &self.event
    }
}

/// Events in ascending `occurred_at` order.
///
/// Sorting is stable: events sharing a timestamp keep their input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortedEvents {
    events: Vec<TimedEvent>,
    /// Events dropped for lacking a usable timestamp
    unordered: usize,
}

impl SortedEvents {
    /// Sorts an arbitrary-order batch, excluding events with no timestamp.
    pub fn from_unordered(events: Vec<Event>) -> Self {
        let total = events.len();
        let mut timed: Vec<TimedEvent> = events
            .into_iter()
            .filter_map(|event| event.occurred_at.map(|at| TimedEvent { at, event }))
            .collect();
        let unordered = total - timed.len();
        if unordered > 0 {
            debug!(dropped = unordered, "Excluded events without a timestamp");
        }

        // Vec::sort_by_key is stable
        timed.sort_by_key(|e| e.at);

        Self {
            events: timed,
            unordered,
        }
    }

    /// Builds from events already known to be ordered (e.g. a split of a
    /// larger sorted run).
    pub(crate) fn from_sorted(events: Vec<TimedEvent>) -> Self {
        debug_assert!(events.windows(2).all(|w| w[0].at <= w[1].at));
        Self {
            events,
            unordered: 0,
        }
    }

    pub fn first_at(&self) -> Option<DateTime<Utc>> {
        self.events.first().map(|e| e.at)
    }

    pub fn last_at(&self) -> Option<DateTime<Utc>> {
        self.events.last().map(|e| e.at)
    }

    /// Number of input events excluded for lacking a timestamp.
    pub fn unordered_count(&self) -> usize {
        self.unordered
    }

    pub fn into_inner(self) -> Vec<TimedEvent> {
        self.events
    }
}

impl Deref for SortedEvents {
    type Target = [TimedEvent];

    fn deref(&self) -> &[TimedEvent] {
        &self.events
    }
}
