//! Incremental rebuild: re-derives every journey touched by recent events.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use engine_core::{Error, EventStore, HeuristicsConfig, JourneyStore, Result};
use reconstruct::ConsolidationPlanner;
use serde::Serialize;
use telemetry::metrics;
use tracing::{debug, info};

use crate::consolidation::ConsolidationWorker;

/// A journey that failed to rebuild, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyError {
    pub journey_id: String,
    pub reason: String,
}

impl JourneyError {
    pub(crate) fn new(journey_id: impl Into<String>, error: &Error) -> Self {
        Self {
            journey_id: journey_id.into(),
            reason: error.to_string(),
        }
    }
}

/// Result of one incremental run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildSummary {
    /// Touched session ids
    pub processed: usize,
    /// Journeys upserted, including untouched sessions on the same IPs
    pub updated: usize,
    /// Touched sessions with nothing to reconstruct
    pub skipped: usize,
    /// Journey ids folded into another session and removed
    pub duplicates_deleted: u64,
    /// Sorted by journey id
    pub errors: Vec<JourneyError>,
}

/// Re-derives the journeys touched by recent events.
///
/// Touched sessions are resolved to their IPs and those IPs are re-planned
/// exactly as a full consolidation would plan them, so an incremental run
/// never reintroduces ids that consolidation folded away. Sessions with no
/// IP are left alone: consolidation treats them as unattributable.
#[derive(Clone)]
pub struct RebuildWorker {
    events: Arc<dyn EventStore>,
    consolidation: ConsolidationWorker,
    site_id: Option<String>,
}

impl RebuildWorker {
    pub fn new(
        events: Arc<dyn EventStore>,
        journeys: Arc<dyn JourneyStore>,
        heuristics: Arc<HeuristicsConfig>,
        max_concurrency: usize,
    ) -> Self {
        let consolidation =
            ConsolidationWorker::new(Arc::clone(&events), journeys, heuristics, max_concurrency);
        Self {
            events,
            consolidation,
            site_id: None,
        }
    }

    /// Restricts re-planned IPs to one site's events, matching a
    /// site-scoped consolidation.
    pub fn with_site(mut self, site_id: Option<String>) -> Self {
        self.site_id = site_id;
        self
    }

    /// Rebuilds every IP with a session that has an event at or after
    /// `since` (all sessions when `None`).
    ///
    /// Store reads abort the run. A journey that fails to write is recorded
    /// in the summary and the rest continue; duplicate deletion is then
    /// skipped for the run.
    pub async fn run_incremental(&self, since: Option<DateTime<Utc>>) -> Result<RebuildSummary> {
        let start = Instant::now();
        let session_ids = self.events.list_unique_session_ids(since).await?;

        info!(
            sessions = session_ids.len(),
            since = ?since,
            "Incremental rebuild starting"
        );

        let ips = self.connected_ips(&session_ids).await?;
        let mut planner = ConsolidationPlanner::new();
        let pass = self
            .consolidation
            .consolidate_ips(&ips, self.site_id.as_deref(), &mut planner)
            .await?;
        let duplicates_deleted = self
            .consolidation
            .delete_duplicates(&planner, pass.errors.len())
            .await?;

        let skipped: Vec<&String> = session_ids
            .iter()
            .filter(|id| !planner.has_seen(id))
            .collect();
        for session_id in &skipped {
            debug!(journey_id = %session_id, "Session has no timed IP-bearing event, skipping");
        }

        let summary = RebuildSummary {
            processed: session_ids.len(),
            updated: pass.journeys_upserted,
            skipped: skipped.len(),
            duplicates_deleted,
            errors: pass.errors,
        };

        let elapsed = start.elapsed().as_millis() as u64;
        metrics().rebuild_latency_ms.observe(elapsed);
        info!(
            processed = summary.processed,
            ips = ips.len(),
            updated = summary.updated,
            skipped = summary.skipped,
            duplicates_deleted = summary.duplicates_deleted,
            errors = summary.errors.len(),
            elapsed_ms = elapsed,
            "Incremental rebuild complete"
        );

        Ok(summary)
    }

    /// IPs of `session_ids`, widened until every session seen on one of
    /// them has all of its IPs in the set. Journey ids are claimed per IP,
    /// so only a closed set of IPs claims the same ids as a full run.
    async fn connected_ips(&self, session_ids: &[String]) -> Result<Vec<String>> {
        let mut known: HashSet<String> = session_ids.iter().cloned().collect();
        let mut ips: BTreeSet<String> = BTreeSet::new();
        let mut frontier = self.events.list_ips_for_sessions(session_ids).await?;

        loop {
            frontier.retain(|ip| ips.insert(ip.clone()));
            if frontier.is_empty() {
                break;
            }

            let mut sessions = BTreeSet::new();
            for ip in &frontier {
                for event in self.events.list_events_for_ip(ip, self.site_id.as_deref()).await? {
                    if known.insert(event.session_id.clone()) {
                        sessions.insert(event.session_id);
                    }
                }
            }
            if sessions.is_empty() {
                break;
            }

            let sessions: Vec<String> = sessions.into_iter().collect();
            frontier = self.events.list_ips_for_sessions(&sessions).await?;
        }

        Ok(ips.into_iter().collect())
    }
}
