//! Event and journey store contracts.
//!
//! The engine only reads events and replaces journeys; both stores are
//! external collaborators. Implementations own their own timeouts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::events::Event;
use crate::journey::Journey;

/// Append-only log of behavioural events.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// All events recorded under one journey/session id.
    async fn list_events_for_session(&self, session_id: &str) -> Result<Vec<Event>>;

    /// All events from one IP address, optionally scoped to a site.
    async fn list_events_for_ip(&self, ip: &str, site_id: Option<&str>) -> Result<Vec<Event>>;

    /// Every distinct non-empty IP address.
    async fn list_all_ips(&self, site_id: Option<&str>) -> Result<Vec<String>>;

    /// Session ids with at least one event at or after `since`.
    async fn list_unique_session_ids(&self, since: Option<DateTime<Utc>>) -> Result<Vec<String>>;

    /// Distinct non-empty IP addresses carried by any event of the given
    /// sessions.
    async fn list_ips_for_sessions(&self, session_ids: &[String]) -> Result<Vec<String>>;
}

/// Keyed store of reconstructed journeys.
#[async_trait]
pub trait JourneyStore: Send + Sync {
    /// Insert or replace the journey with the same id.
    async fn upsert_journey(&self, journey: &Journey) -> Result<()>;

    /// Delete journeys by id, returning how many were requested for removal.
    async fn delete_journeys_by_ids(&self, ids: &[String]) -> Result<u64>;

    /// Journeys none of whose events carry an IP address.
    async fn list_journeys_with_no_ip(&self, site_id: Option<&str>) -> Result<Vec<String>>;
}
