//! Full consolidation: regroups every IP's events into gap-separated
//! sessions, rewrites one journey per session, and removes the journey ids
//! that were folded into another session or carry no IP at all.

use std::sync::Arc;
use std::time::Instant;

use engine_core::{EventStore, HeuristicsConfig, JourneyStore, Result};
use reconstruct::{reconstruct, ConsolidationPlanner, JourneyContext, PlannedSession};
use serde::Serialize;
use telemetry::metrics;
use tracing::{debug, info, warn};

use crate::pool::{bounded, persist};
use crate::rebuild::JourneyError;

/// Result of one consolidation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsolidationSummary {
    pub ips_scanned: usize,
    pub sessions_built: usize,
    pub journeys_upserted: usize,
    pub duplicates_deleted: u64,
    pub orphans_deleted: u64,
    /// Sorted by journey id
    pub errors: Vec<JourneyError>,
}

/// Sessions planned and written for a set of IPs.
#[derive(Debug, Default)]
pub(crate) struct IpPass {
    pub sessions_built: usize,
    pub journeys_upserted: usize,
    /// Sorted by journey id
    pub errors: Vec<JourneyError>,
}

/// Rebuilds the journey table from the per-IP view of the event log.
#[derive(Clone)]
pub struct ConsolidationWorker {
    events: Arc<dyn EventStore>,
    journeys: Arc<dyn JourneyStore>,
    heuristics: Arc<HeuristicsConfig>,
    max_concurrency: usize,
}

impl ConsolidationWorker {
    pub fn new(
        events: Arc<dyn EventStore>,
        journeys: Arc<dyn JourneyStore>,
        heuristics: Arc<HeuristicsConfig>,
        max_concurrency: usize,
    ) -> Self {
        Self {
            events,
            journeys,
            heuristics,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Runs one consolidation pass, optionally scoped to a site.
    ///
    /// Store failures while listing or deleting abort the run. A journey
    /// that fails to upsert is recorded, and duplicate deletion is skipped
    /// for that run so no folded journey is removed before its replacement
    /// exists.
    pub async fn run(&self, site_id: Option<&str>) -> Result<ConsolidationSummary> {
        let start = Instant::now();
        let mut ips = self.events.list_all_ips(site_id).await?;
        ips.sort();
        ips.dedup();

        info!(ips = ips.len(), site_id = ?site_id, "Consolidation starting");

        let mut planner = ConsolidationPlanner::new();
        let pass = self.consolidate_ips(&ips, site_id, &mut planner).await?;

        let mut summary = ConsolidationSummary {
            ips_scanned: ips.len(),
            sessions_built: pass.sessions_built,
            journeys_upserted: pass.journeys_upserted,
            errors: pass.errors,
            ..Default::default()
        };
        summary.duplicates_deleted = self.delete_duplicates(&planner, summary.errors.len()).await?;

        let orphans = self.journeys.list_journeys_with_no_ip(site_id).await?;
        summary.orphans_deleted = self.journeys.delete_journeys_by_ids(&orphans).await?;
        metrics().orphans_deleted.inc_by(summary.orphans_deleted);

        let elapsed = start.elapsed().as_millis() as u64;
        info!(
            ips_scanned = summary.ips_scanned,
            sessions_built = summary.sessions_built,
            journeys_upserted = summary.journeys_upserted,
            duplicates_deleted = summary.duplicates_deleted,
            orphans_deleted = summary.orphans_deleted,
            claimed = planner.claimed_count(),
            errors = summary.errors.len(),
            elapsed_ms = elapsed,
            "Consolidation complete"
        );

        Ok(summary)
    }

    /// Plans and writes the sessions of `ips`, at most `max_concurrency`
    /// IPs at a time, so only one chunk's events are held in memory.
    ///
    /// `ips` must be sorted: the planner claims journey ids in the order it
    /// sees IPs, and the same order yields the same ids on every run.
    pub(crate) async fn consolidate_ips(
        &self,
        ips: &[String],
        site_id: Option<&str>,
        planner: &mut ConsolidationPlanner,
    ) -> Result<IpPass> {
        let gap = self.heuristics.session.gap_secs;
        let mut pass = IpPass::default();

        for chunk in ips.chunks(self.max_concurrency) {
            let mut fetched = bounded(
                chunk.iter().cloned().enumerate(),
                self.max_concurrency,
                |(idx, ip)| {
                    let events = Arc::clone(&self.events);
                    let site_id = site_id.map(str::to_owned);
                    async move {
                        let result = events.list_events_for_ip(&ip, site_id.as_deref()).await;
                        (idx, ip, result)
                    }
                },
            )
            .await;
            fetched.sort_by_key(|(idx, _, _)| *idx);

            let mut planned: Vec<PlannedSession> = Vec::new();
            for (_, ip, result) in fetched {
                let sessions = planner.plan_ip(result?, gap);
                debug!(ip = %ip, sessions = sessions.len(), "Planned IP sessions");
                planned.extend(sessions);
            }
            pass.sessions_built += planned.len();

            let results = bounded(planned, self.max_concurrency, |session| {
                let worker = self.clone();
                async move {
                    let journey_id = session.journey_id.clone();
                    (journey_id, worker.write_session(session).await)
                }
            })
            .await;

            for (journey_id, result) in results {
                match result {
                    Ok(true) => pass.journeys_upserted += 1,
                    Ok(false) => {}
                    Err(e) => {
                        metrics().journeys_failed.inc();
                        warn!(journey_id = %journey_id, error = %e, "Consolidated journey failed");
                        pass.errors.push(JourneyError::new(journey_id, &e));
                    }
                }
            }
        }

        pass.errors.sort_by(|a, b| a.journey_id.cmp(&b.journey_id));
        Ok(pass)
    }

    /// Deletes the ids the planner folded away, unless `failed` upserts
    /// left some replacement unwritten.
    pub(crate) async fn delete_duplicates(
        &self,
        planner: &ConsolidationPlanner,
        failed: usize,
    ) -> Result<u64> {
        if failed > 0 {
            warn!(errors = failed, "Skipping duplicate deletion after failed upserts");
            return Ok(0);
        }
        let deleted = self.journeys.delete_journeys_by_ids(&planner.duplicates()).await?;
        metrics().duplicates_deleted.inc_by(deleted);
        Ok(deleted)
    }

    /// Builds and upserts one planned session. Returns whether a journey
    /// was written.
    async fn write_session(&self, session: PlannedSession) -> Result<bool> {
        let ctx = JourneyContext::new(session.journey_id, session.visit_number).with_heartbeat_cap();
        let Some(journey) = reconstruct(&session.events, &ctx, &self.heuristics) else {
            return Ok(false);
        };
        persist(self.journeys.as_ref(), &journey).await?;
        Ok(true)
    }
}
