//! Mock implementations for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{Error, Event, EventStore, Journey, JourneyStore, Result, StoreErrorCode};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct State {
    events: Vec<Event>,
    journeys: BTreeMap<String, Journey>,
    upserts: usize,
    fail_reads: bool,
    fail_writes: bool,
    fail_upsert_for: HashSet<String>,
}

/// In-memory event log and journey table.
///
/// Implements both `EventStore` and `JourneyStore` with the same semantics
/// as the ClickHouse stores. Events are returned in insertion order, so
/// tests can feed the workers deliberately shuffled input.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(events: Vec<Event>) -> Self {
        let store = Self::new();
        store.push_events(events);
        store
    }

    /// Append events to the log.
    pub fn push_events(&self, events: impl IntoIterator<Item = Event>) {
        self.state.lock().events.extend(events);
    }

    /// Stored events of one session, in insertion order.
    pub fn session_events(&self, session_id: &str) -> Vec<Event> {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Seed a journey directly, bypassing the workers.
    pub fn insert_journey(&self, journey: Journey) {
        self.state
            .lock()
            .journeys
            .insert(journey.journey_id.clone(), journey);
    }

    /// All stored journeys, ordered by id.
    pub fn journeys(&self) -> Vec<Journey> {
        self.state.lock().journeys.values().cloned().collect()
    }

    pub fn journey(&self, id: &str) -> Option<Journey> {
        self.state.lock().journeys.get(id).cloned()
    }

    pub fn journey_ids(&self) -> Vec<String> {
        self.state.lock().journeys.keys().cloned().collect()
    }

    /// Number of successful upserts so far.
    pub fn upsert_count(&self) -> usize {
        self.state.lock().upserts
    }

    /// Make every read fail with STORE_001.
    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().fail_reads = fail;
    }

    /// Make every upsert and delete fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make upserts of one journey id fail.
    pub fn fail_upsert_for(&self, journey_id: &str) {
        self.state
            .lock()
            .fail_upsert_for
            .insert(journey_id.to_string());
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> Result<T> {
        let state = self.state.lock();
        if state.fail_reads {
            return Err(Error::store(StoreErrorCode::ReadFailed, "mock read failure"));
        }
        Ok(f(&state))
    }
}

fn site_matches(event: &Event, site_id: Option<&str>) -> bool {
    site_id.map_or(true, |site| event.site_id.as_deref() == Some(site))
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn list_events_for_session(&self, session_id: &str) -> Result<Vec<Event>> {
        self.read(|state| {
            state
                .events
                .iter()
                .filter(|e| e.session_id == session_id)
                .cloned()
                .collect()
        })
    }

    async fn list_events_for_ip(&self, ip: &str, site_id: Option<&str>) -> Result<Vec<Event>> {
        self.read(|state| {
            state
                .events
                .iter()
                .filter(|e| e.ip_address.as_deref() == Some(ip) && site_matches(e, site_id))
                .cloned()
                .collect()
        })
    }

    async fn list_all_ips(&self, site_id: Option<&str>) -> Result<Vec<String>> {
        self.read(|state| {
            state
                .events
                .iter()
                .filter(|e| e.has_ip() && site_matches(e, site_id))
                .filter_map(|e| e.ip_address.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }

    async fn list_unique_session_ids(&self, since: Option<DateTime<Utc>>) -> Result<Vec<String>> {
        self.read(|state| {
            state
                .events
                .iter()
                .filter(|e| match since {
                    Some(since) => e.occurred_at.is_some_and(|t| t >= since),
                    None => true,
                })
                .map(|e| e.session_id.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }

    async fn list_ips_for_sessions(&self, session_ids: &[String]) -> Result<Vec<String>> {
        self.read(|state| {
            state
                .events
                .iter()
                .filter(|e| e.has_ip() && session_ids.contains(&e.session_id))
                .filter_map(|e| e.ip_address.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        })
    }
}

#[async_trait]
impl JourneyStore for MemoryStore {
    async fn upsert_journey(&self, journey: &Journey) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_writes || state.fail_upsert_for.contains(&journey.journey_id) {
            return Err(Error::store(StoreErrorCode::WriteFailed, "mock upsert failure"));
        }
        state
            .journeys
            .insert(journey.journey_id.clone(), journey.clone());
        state.upserts += 1;
        Ok(())
    }

    async fn delete_journeys_by_ids(&self, ids: &[String]) -> Result<u64> {
        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(Error::store(StoreErrorCode::DeleteFailed, "mock delete failure"));
        }
        for id in ids {
            state.journeys.remove(id);
        }
        Ok(ids.len() as u64)
    }

    async fn list_journeys_with_no_ip(&self, site_id: Option<&str>) -> Result<Vec<String>> {
        self.read(|state| {
            let with_ip: HashSet<&str> = state
                .events
                .iter()
                .filter(|e| e.has_ip())
                .map(|e| e.session_id.as_str())
                .collect();

            state
                .journeys
                .values()
                .filter(|j| {
                    j.primary_ip_address
                        .as_deref()
                        .map_or(true, |ip| ip.trim().is_empty())
                })
                .filter(|j| !with_ip.contains(j.journey_id.as_str()))
                .filter(|j| site_id.map_or(true, |site| j.site_id.as_deref() == Some(site)))
                .map(|j| j.journey_id.clone())
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, page};

    #[tokio::test]
    async fn test_lists_sessions_since_cutoff() {
        let store = MemoryStore::with_events(vec![
            page("old", "e1", "/", 0),
            page("new", "e2", "/", 3_600),
        ]);

        let all = store.list_unique_session_ids(None).await.unwrap();
        assert_eq!(all, vec!["new", "old"]);

        let recent = store.list_unique_session_ids(Some(at(60))).await.unwrap();
        assert_eq!(recent, vec!["new"]);
    }

    #[tokio::test]
    async fn test_session_events_keep_insertion_order() {
        let store = MemoryStore::with_events(vec![
            page("s1", "late", "/b", 60),
            page("s2", "other", "/", 0),
            page("s1", "early", "/a", 0),
        ]);

        let events = store.list_events_for_session("s1").await.unwrap();
        let ids: Vec<&str> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["late", "early"]);
    }

    #[tokio::test]
    async fn test_lists_ips_for_sessions() {
        let store = MemoryStore::with_events(vec![
            page("s1", "e1", "/", 0).with_ip("198.51.100.2"),
            page("s1", "e2", "/a", 30).with_ip("198.51.100.1"),
            page("s2", "e3", "/", 60).with_ip("198.51.100.3"),
            page("s3", "e4", "/", 90),
        ]);

        let ips = store
            .list_ips_for_sessions(&["s1".to_string(), "s3".to_string()])
            .await
            .unwrap();
        assert_eq!(ips, vec!["198.51.100.1", "198.51.100.2"]);
        assert!(store.list_ips_for_sessions(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_failure_mode() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);

        let err = store.list_all_ips(None).await.unwrap_err();
        assert_eq!(err.error_code(), Some("STORE_001"));
    }
}
