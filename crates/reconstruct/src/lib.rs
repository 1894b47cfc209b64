//! Journey reconstruction pipeline.
//!
//! Every step is a pure function over a chronologically sorted event list:
//!
//! 1. [`sort`] orders a session's events
//! 2. [`sequence`], [`metrics`], [`friction`], [`classify`], [`confidence`]
//!    and [`bot`] each derive one facet
//! 3. [`journey::reconstruct`] merges the facets into a `Journey`
//!
//! [`session`] re-segments one IP's events by time gap for consolidation.

pub mod bot;
pub mod classify;
pub mod confidence;
pub mod forms;
pub mod friction;
pub mod journey;
pub mod metrics;
pub mod sequence;
pub mod session;
pub mod sort;


pub use bot::{score_event, score_journey, BotVerdict};
pub use journey::{reconstruct, JourneyContext};
pub use session::{meaningful_event_count, split_sessions, ConsolidationPlanner, PlannedSession};
pub use sort::{SortedEvents, TimedEvent};
