//! ClickHouse table schemas.
//!
//! - `journey_events`: append-only event log, read by session and by IP
//! - `journeys`: one row per journey id; `ReplacingMergeTree(version)` makes
//!   each insert a last-writer-wins upsert, so reads use `FINAL`
//!
//! Nested journey facets are stored as JSON strings. DDL is templated on
//! the database name.

/// Event log table name.
pub const EVENTS_TABLE: &str = "journey_events";

/// Journey table name.
pub const JOURNEYS_TABLE: &str = "journeys";

const CREATE_DATABASE: &str = "CREATE DATABASE IF NOT EXISTS {db}";

const CREATE_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS {db}.journey_events (
    -- Identifiers
    event_id String,
    session_id String,
    visitor_id Nullable(String),
    site_id Nullable(String),

    -- Client
    ip_address Nullable(String),
    user_agent Nullable(String),
    device_type Nullable(String),

    -- Interaction
    event_type LowCardinality(String),
    page_url Nullable(String),
    referrer Nullable(String),
    intent_type Nullable(String),
    cta_label Nullable(String),

    -- Client timestamp; NULL when missing or malformed
    occurred_at Nullable(DateTime64(3)),

    -- Semi-structured payload (JSON)
    metadata String DEFAULT '{}',

    received_at DateTime64(3) DEFAULT now64(3)
)
ENGINE = MergeTree()
PARTITION BY toYYYYMM(received_at)
ORDER BY (session_id, received_at, event_id)
SETTINGS index_granularity = 8192
"#;

const CREATE_JOURNEYS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS {db}.journeys (
    journey_id String,
    visitor_id Nullable(String),
    visit_number UInt32,
    first_seen DateTime64(3),
    last_seen DateTime64(3),
    entry_page Nullable(String),
    entry_referrer Nullable(String),
    initial_intent LowCardinality(String),
    page_sequence String,
    event_count UInt32,
    outcome LowCardinality(String),
    outcome_detail String,
    time_to_action Nullable(Int64),
    loops String,
    friction String,
    confidence UInt8,
    engagement_metrics String,
    is_bot Bool,
    bot_score UInt8,
    bot_type Nullable(String),
    bot_signals Array(String),
    site_id Nullable(String),
    primary_ip_address Nullable(String),

    -- Write version (ms since epoch); highest wins on merge
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY journey_id
SETTINGS index_granularity = 8192
"#;

/// Returns all DDL statements for `database`, in execution order.
pub fn all_tables(database: &str) -> Vec<String> {
    [CREATE_DATABASE, CREATE_EVENTS_TABLE, CREATE_JOURNEYS_TABLE]
        .iter()
        .map(|ddl| ddl.replace("{db}", database))
        .collect()
}
