//! Bounded fan-out over independent journey tasks.

use std::future::Future;
use std::sync::Arc;

use engine_core::{Journey, JourneyStore, Result};
use telemetry::metrics;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Runs one task per item with at most `limit` in flight, returning results
/// in completion order. A panicked task is logged and dropped.
pub(crate) async fn bounded<I, F, Fut, R>(items: I, limit: usize, task: F) -> Vec<R>
where
    I: IntoIterator,
    F: Fn(I::Item) -> Fut,
    Fut: Future<Output = R> + Send + 'static,
    R: Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let mut tasks = JoinSet::new();

    for item in items {
        let fut = task(item);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            metrics().rebuilds_in_flight.inc();
            let result = fut.await;
            metrics().rebuilds_in_flight.dec();
            result
        });
    }

    let mut results = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => {
                metrics().journeys_failed.inc();
                error!(error = %e, "Journey task panicked");
            }
        }
    }
    results
}

/// Validates and upserts a reconstructed journey, recording the rebuild
/// counters.
pub(crate) async fn persist(journeys: &dyn JourneyStore, journey: &Journey) -> Result<()> {
    journey.check()?;
    journeys.upsert_journey(journey).await?;

    metrics().journeys_rebuilt.inc();
    if journey.is_bot {
        metrics().bots_detected.inc();
    }
    debug!(
        journey_id = %journey.journey_id,
        outcome = journey.outcome.as_str(),
        bot_score = journey.bot_score,
        "Journey persisted"
    );
    Ok(())
}
