//! Row types and conversions for `journey_events` and `journeys`.

use chrono::{DateTime, Utc};
use clickhouse::Row;
use engine_core::{Event, EventMetadata, Journey, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Column list matching [`EventRow`] field order.
pub const EVENT_COLUMNS: &str = "event_id, session_id, visitor_id, site_id, ip_address, \
     user_agent, device_type, event_type, page_url, referrer, intent_type, cta_label, \
     toUnixTimestamp64Milli(occurred_at) AS occurred_at_ms, metadata";

/// Event row as read from `journey_events`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct EventRow {
    pub event_id: String,
    pub session_id: String,
    pub visitor_id: Option<String>,
    pub site_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub event_type: String,
    pub page_url: Option<String>,
    pub referrer: Option<String>,
    pub intent_type: Option<String>,
    pub cta_label: Option<String>,
    /// Milliseconds since epoch
    pub occurred_at_ms: Option<i64>,
    pub metadata: String,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        let metadata = EventMetadata::from_json(&row.metadata).unwrap_or_else(|e| {
            warn!(event_id = %row.event_id, error = %e, "Malformed event metadata, ignoring");
            EventMetadata::default()
        });

        Event {
            id: row.event_id,
            session_id: row.session_id,
            visitor_id: row.visitor_id,
            site_id: row.site_id,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            event_type: row.event_type.into(),
            page_url: row.page_url,
            referrer: row.referrer,
            intent_type: row.intent_type.map(Into::into),
            cta_label: row.cta_label,
            device_type: row.device_type,
            occurred_at: row.occurred_at_ms.and_then(DateTime::<Utc>::from_timestamp_millis),
            metadata,
        }
    }
}

/// Journey row written to `journeys`.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct JourneyRow {
    pub journey_id: String,
    pub visitor_id: Option<String>,
    pub visit_number: u32,
    /// Milliseconds since epoch
    pub first_seen: i64,
    pub last_seen: i64,
    pub entry_page: Option<String>,
    pub entry_referrer: Option<String>,
    pub initial_intent: String,
    pub page_sequence: String,
    pub event_count: u32,
    pub outcome: String,
    pub outcome_detail: String,
    pub time_to_action: Option<i64>,
    pub loops: String,
    pub friction: String,
    pub confidence: u8,
    pub engagement_metrics: String,
    pub is_bot: bool,
    pub bot_score: u8,
    pub bot_type: Option<String>,
    pub bot_signals: Vec<String>,
    pub site_id: Option<String>,
    pub primary_ip_address: Option<String>,
    pub version: u64,
}

impl JourneyRow {
    /// Flattens a journey, serializing nested facets as JSON.
    pub fn from_journey(journey: &Journey, version: u64) -> Result<Self> {
        Ok(Self {
            journey_id: journey.journey_id.clone(),
            visitor_id: journey.visitor_id.clone(),
            visit_number: journey.visit_number,
            first_seen: journey.first_seen.timestamp_millis(),
            last_seen: journey.last_seen.timestamp_millis(),
            entry_page: journey.entry_page.clone(),
            entry_referrer: journey.entry_referrer.clone(),
            initial_intent: journey.initial_intent.as_str().to_string(),
            page_sequence: serde_json::to_string(&journey.page_sequence)?,
            event_count: journey.event_count,
            outcome: journey.outcome.as_str().to_string(),
            outcome_detail: serde_json::to_string(&journey.outcome_detail)?,
            time_to_action: journey.time_to_action,
            loops: serde_json::to_string(&journey.loops)?,
            friction: serde_json::to_string(&journey.friction)?,
            confidence: journey.confidence,
            engagement_metrics: serde_json::to_string(&journey.engagement_metrics)?,
            is_bot: journey.is_bot,
            bot_score: journey.bot_score,
            bot_type: journey.bot_type.map(|t| t.as_str().to_string()),
            bot_signals: journey.bot_signals.clone(),
            site_id: journey.site_id.clone(),
            primary_ip_address: journey.primary_ip_address.clone(),
            version,
        })
    }
}
