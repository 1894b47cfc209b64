//! `EventStore` and `JourneyStore` over ClickHouse.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{Event, EventStore, Journey, JourneyStore, Result, StoreErrorCode};
use telemetry::metrics;
use tracing::debug;

use crate::client::ClickHouseClient;
use crate::rows::{EventRow, JourneyRow, EVENT_COLUMNS};
use crate::schema::{EVENTS_TABLE, JOURNEYS_TABLE};

/// `AND site_id = ?` when a site scope is given.
fn site_clause(site_id: Option<&str>) -> &'static str {
    if site_id.is_some() {
        " AND site_id = ?"
    } else {
        ""
    }
}

fn to_events(rows: Vec<EventRow>) -> Vec<Event> {
    metrics().events_read.inc_by(rows.len() as u64);
    rows.into_iter().map(Event::from).collect()
}

#[async_trait]
impl EventStore for ClickHouseClient {
    async fn list_events_for_session(&self, session_id: &str) -> Result<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM {} WHERE session_id = ? ORDER BY occurred_at, event_id",
            self.table(EVENTS_TABLE)
        );
        let query = self.inner().query(&sql).bind(session_id);
        let rows = self
            .timed(StoreErrorCode::ReadFailed, "list_events_for_session", query.fetch_all::<EventRow>())
            .await?;
        Ok(to_events(rows))
    }

    async fn list_events_for_ip(&self, ip: &str, site_id: Option<&str>) -> Result<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM {} WHERE ip_address = ?{} ORDER BY occurred_at, event_id",
            self.table(EVENTS_TABLE),
            site_clause(site_id)
        );
        let mut query = self.inner().query(&sql).bind(ip);
        if let Some(site) = site_id {
            query = query.bind(site);
        }
        let rows = self
            .timed(StoreErrorCode::ReadFailed, "list_events_for_ip", query.fetch_all::<EventRow>())
            .await?;
        Ok(to_events(rows))
    }

    async fn list_all_ips(&self, site_id: Option<&str>) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT DISTINCT assumeNotNull(ip_address) AS ip FROM {} \
             WHERE ip_address IS NOT NULL AND ip_address != ''{} ORDER BY ip",
            self.table(EVENTS_TABLE),
            site_clause(site_id)
        );
        let mut query = self.inner().query(&sql);
        if let Some(site) = site_id {
            query = query.bind(site);
        }
        self.timed(StoreErrorCode::ReadFailed, "list_all_ips", query.fetch_all::<String>())
            .await
    }

    async fn list_unique_session_ids(&self, since: Option<DateTime<Utc>>) -> Result<Vec<String>> {
        let table = self.table(EVENTS_TABLE);
        let query = match since {
            Some(since) => self
                .inner()
                .query(&format!(
                    "SELECT DISTINCT session_id FROM {table} \
                     WHERE occurred_at >= fromUnixTimestamp64Milli(?) ORDER BY session_id"
                ))
                .bind(since.timestamp_millis()),
            None => self
                .inner()
                .query(&format!("SELECT DISTINCT session_id FROM {table} ORDER BY session_id")),
        };
        self.timed(StoreErrorCode::ReadFailed, "list_unique_session_ids", query.fetch_all::<String>())
            .await
    }

    async fn list_ips_for_sessions(&self, session_ids: &[String]) -> Result<Vec<String>> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT DISTINCT assumeNotNull(ip_address) AS ip FROM {} \
             WHERE session_id IN ? AND ip_address IS NOT NULL AND ip_address != '' ORDER BY ip",
            self.table(EVENTS_TABLE)
        );
        let query = self.inner().query(&sql).bind(session_ids);
        self.timed(StoreErrorCode::ReadFailed, "list_ips_for_sessions", query.fetch_all::<String>())
            .await
    }
}

#[async_trait]
impl JourneyStore for ClickHouseClient {
    async fn upsert_journey(&self, journey: &Journey) -> Result<()> {
        journey.check()?;
        let row = JourneyRow::from_journey(journey, Utc::now().timestamp_millis().max(0) as u64)?;
        let table = self.table(JOURNEYS_TABLE);

        self.timed(StoreErrorCode::WriteFailed, "upsert_journey", async {
            let mut insert = self.inner().insert(&table)?;
            insert.write(&row).await?;
            insert.end().await
        })
        .await?;

        debug!(journey_id = %journey.journey_id, "Upserted journey");
        Ok(())
    }

    async fn delete_journeys_by_ids(&self, ids: &[String]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!("DELETE FROM {} WHERE journey_id IN ?", self.table(JOURNEYS_TABLE));
        let query = self.inner().query(&sql).bind(ids);
        self.timed(StoreErrorCode::DeleteFailed, "delete_journeys_by_ids", query.execute())
            .await?;

        debug!(count = ids.len(), "Deleted journeys");
        Ok(ids.len() as u64)
    }

    async fn list_journeys_with_no_ip(&self, site_id: Option<&str>) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT journey_id FROM {journeys} FINAL \
             WHERE (primary_ip_address IS NULL OR primary_ip_address = ''){site} \
             AND journey_id NOT IN (\
                SELECT DISTINCT session_id FROM {events} \
                WHERE ip_address IS NOT NULL AND ip_address != '') \
             ORDER BY journey_id",
            journeys = self.table(JOURNEYS_TABLE),
            events = self.table(EVENTS_TABLE),
            site = site_clause(site_id),
        );
        let mut query = self.inner().query(&sql);
        if let Some(site) = site_id {
            query = query.bind(site);
        }
        self.timed(StoreErrorCode::ReadFailed, "list_journeys_with_no_ip", query.fetch_all::<String>())
            .await
    }
}
