//! Rebuild scheduler: periodic incremental rebuilds plus on-demand full
//! consolidation.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_core::{EventStore, HeuristicsConfig, JourneyStore, Result};
use serde::{Deserialize, Serialize};
use telemetry::{health, metrics};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::consolidation::{ConsolidationSummary, ConsolidationWorker};
use crate::rebuild::{RebuildSummary, RebuildWorker};

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Incremental rebuild interval
    pub rebuild_interval_secs: u64,
    /// Rolling cutoff for incremental rebuilds; 0 rebuilds every session
    pub lookback_hours: i64,
    /// Journeys rebuilt concurrently
    pub max_concurrency: usize,
    /// Restrict rebuilds and consolidation to one site
    pub site_id: Option<String>,
    /// Run a full consolidation once at startup
    pub consolidate_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rebuild_interval_secs: 300,
            lookback_hours: 2,
            max_concurrency: 8,
            site_id: None,
            consolidate_on_start: false,
        }
    }
}

impl SchedulerConfig {
    /// Cutoff for an incremental run starting at `now`.
    pub fn since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        (self.lookback_hours > 0).then(|| now - chrono::Duration::hours(self.lookback_hours))
    }
}

/// Requests a full consolidation from outside the scheduler.
#[derive(Clone)]
pub struct ConsolidationTrigger(Arc<Notify>);

impl ConsolidationTrigger {
    /// Queues one consolidation. Requests made while one is pending
    /// coalesce into it.
    pub fn fire(&self) {
        self.0.notify_one();
    }
}

/// Drives the rebuild and consolidation workers.
pub struct RebuildScheduler {
    config: SchedulerConfig,
    rebuild: RebuildWorker,
    consolidation: ConsolidationWorker,
    trigger: Arc<Notify>,
    /// Serializes runs so a rebuild never races a consolidation
    run_lock: Mutex<()>,
}

impl RebuildScheduler {
    pub fn new(
        config: SchedulerConfig,
        events: Arc<dyn EventStore>,
        journeys: Arc<dyn JourneyStore>,
        heuristics: HeuristicsConfig,
    ) -> Self {
        let heuristics = Arc::new(heuristics);
        let rebuild = RebuildWorker::new(
            Arc::clone(&events),
            Arc::clone(&journeys),
            Arc::clone(&heuristics),
            config.max_concurrency,
        )
        .with_site(config.site_id.clone());
        let consolidation =
            ConsolidationWorker::new(events, journeys, heuristics, config.max_concurrency);

        Self {
            config,
            rebuild,
            consolidation,
            trigger: Arc::new(Notify::new()),
            run_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Handle for requesting consolidation (e.g. from a signal handler).
    pub fn trigger(&self) -> ConsolidationTrigger {
        ConsolidationTrigger(Arc::clone(&self.trigger))
    }

    /// Runs one incremental rebuild over the configured lookback window.
    pub async fn run_rebuild(&self) -> Result<RebuildSummary> {
        let _guard = self.run_lock.lock().await;
        let result = self
            .rebuild
            .run_incremental(self.config.since(Utc::now()))
            .instrument(run_span("rebuild"))
            .await;
        record_run("rebuild", &result);
        result
    }

    /// Runs one full consolidation.
    pub async fn run_consolidation(&self) -> Result<ConsolidationSummary> {
        let _guard = self.run_lock.lock().await;
        let result = self
            .consolidation
            .run(self.config.site_id.as_deref())
            .instrument(run_span("consolidation"))
            .await;
        record_run("consolidation", &result);
        result
    }

    /// Starts the incremental loop and the consolidation listener.
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        if self.config.consolidate_on_start {
            self.trigger.notify_one();
        }

        let scheduler = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            scheduler.run_rebuild_loop().await;
        }));

        let scheduler = Arc::clone(&self);
        handles.push(tokio::spawn(async move {
            scheduler.run_consolidation_listener().await;
        }));

        info!(
            rebuild_interval_secs = self.config.rebuild_interval_secs,
            lookback_hours = self.config.lookback_hours,
            max_concurrency = self.config.max_concurrency,
            consolidate_on_start = self.config.consolidate_on_start,
            "Rebuild scheduler started"
        );
        handles
    }

    async fn run_rebuild_loop(&self) {
        let mut ticker = interval(Duration::from_secs(self.config.rebuild_interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            // Failures are logged and health-marked in record_run; the next
            // tick retries from scratch.
            let _ = self.run_rebuild().await;
        }
    }

    async fn run_consolidation_listener(&self) {
        loop {
            self.trigger.notified().await;
            let _ = self.run_consolidation().await;
        }
    }
}

/// Span correlating every log line of one run.
fn run_span(run: &'static str) -> tracing::Span {
    info_span!("scheduled_run", run, run_id = %Uuid::new_v4())
}

/// Marks scheduler health from a run result and logs the metrics snapshot.
fn record_run<T>(run: &'static str, result: &Result<T>) {
    match result {
        Ok(_) => health().scheduler.set_healthy(),
        Err(e) => {
            error!(run, code = ?e.error_code(), error = %e, "Scheduled run aborted");
            health().scheduler.set_unhealthy(format!("{run} aborted: {e}"));
        }
    }
    metrics().snapshot().log();
}
