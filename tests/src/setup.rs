//! Common test setup functions.

use engine_core::{Event, EventStore, HeuristicsConfig, JourneyStore};
use reconstruct::{reconstruct, JourneyContext, SortedEvents};
use std::sync::Arc;
use telemetry::{init_tracing, TracingConfig};
use worker::{ConsolidationWorker, RebuildScheduler, RebuildWorker, SchedulerConfig};

use crate::mocks::MemoryStore;

/// Store plus worker wiring shared by the integration tests.
pub struct TestContext {
    pub store: MemoryStore,
    pub heuristics: HeuristicsConfig,
}

impl TestContext {
    pub fn new(events: Vec<Event>) -> Self {
        init_tracing(TracingConfig::new().with_filter("warn"));
        Self {
            store: MemoryStore::with_events(events),
            heuristics: HeuristicsConfig::default(),
        }
    }

    fn stores(&self) -> (Arc<dyn EventStore>, Arc<dyn JourneyStore>) {
        (Arc::new(self.store.clone()), Arc::new(self.store.clone()))
    }

    pub fn rebuild_worker(&self) -> RebuildWorker {
        let (events, journeys) = self.stores();
        RebuildWorker::new(events, journeys, Arc::new(self.heuristics.clone()), 4)
    }

    pub fn consolidation_worker(&self) -> ConsolidationWorker {
        let (events, journeys) = self.stores();
        ConsolidationWorker::new(events, journeys, Arc::new(self.heuristics.clone()), 4)
    }

    pub fn scheduler(&self, config: SchedulerConfig) -> RebuildScheduler {
        let (events, journeys) = self.stores();
        RebuildScheduler::new(config, events, journeys, self.heuristics.clone())
    }

    /// Stores the journey one session's events alone produce, the way a
    /// per-session writer would have before any consolidation.
    pub fn seed_session_journey(&self, session_id: &str) {
        let events = SortedEvents::from_unordered(self.store.session_events(session_id));
        let ctx = JourneyContext::new(session_id, 1);
        if let Some(journey) = reconstruct(&events, &ctx, &self.heuristics) {
            self.store.insert_journey(journey);
        }
    }
}
