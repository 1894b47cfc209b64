//! Behavioural event types captured from website visitors.
//!
//! Event and intent vocabularies are closed but versioned: a tag this build
//! does not know is kept as `Other(..)` and carries no signal, so newer
//! client instrumentation never causes a rejection.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Observed interaction type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    PageView,
    CtaClick,
    DownloadClick,
    ExternalLink,
    FormStart,
    FormFieldBlur,
    FormSubmit,
    FormAbandon,
    ScrollDepth,
    Heartbeat,
    RageClick,
    ExitIntent,
    PixelView,
    SectionView,
    SiteSearch,
    /// Unrecognized tag, preserved verbatim.
    Other(String),
}

impl EventType {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::PageView => "page_view",
            Self::CtaClick => "cta_click",
            Self::DownloadClick => "download_click",
            Self::ExternalLink => "external_link",
            Self::FormStart => "form_start",
            Self::FormFieldBlur => "form_field_blur",
            Self::FormSubmit => "form_submit",
            Self::FormAbandon => "form_abandon",
            Self::ScrollDepth => "scroll_depth",
            Self::Heartbeat => "heartbeat",
            Self::RageClick => "rage_click",
            Self::ExitIntent => "exit_intent",
            Self::PixelView => "pixel_view",
            Self::SectionView => "section_view",
            Self::SiteSearch => "site_search",
            Self::Other(tag) => tag,
        }
    }

    /// Click-like events that can carry an intent (`cta_click`,
    /// `download_click`, `external_link`).
    pub fn is_click(&self) -> bool {
        matches!(self, Self::CtaClick | Self::DownloadClick | Self::ExternalLink)
    }

    /// Events that count as the visitor taking an action.
    pub fn is_action(&self) -> bool {
        self.is_click() || matches!(self, Self::FormStart | Self::FormSubmit)
    }
}

impl From<String> for EventType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "page_view" => Self::PageView,
            "cta_click" => Self::CtaClick,
            "download_click" => Self::DownloadClick,
            "external_link" => Self::ExternalLink,
            "form_start" => Self::FormStart,
            "form_field_blur" => Self::FormFieldBlur,
            "form_submit" => Self::FormSubmit,
            "form_abandon" => Self::FormAbandon,
            "scroll_depth" => Self::ScrollDepth,
            "heartbeat" => Self::Heartbeat,
            "rage_click" => Self::RageClick,
            "exit_intent" => Self::ExitIntent,
            "pixel_view" => Self::PixelView,
            "section_view" => Self::SectionView,
            "site_search" => Self::SiteSearch,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for EventType {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<EventType> for String {
    fn from(event_type: EventType) -> Self {
        match event_type {
            EventType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

/// Visitor intent tag attached to clicks and form events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IntentType {
    BookVisit,
    Enquire,
    Apply,
    Prospectus,
    Demo,
    Contact,
    Calculate,
    Download,
    External,
    Admissions,
    Browsing,
    /// Unrecognized tag, preserved verbatim.
    Other(String),
}

impl IntentType {
    /// Returns the wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            Self::BookVisit => "book_visit",
            Self::Enquire => "enquire",
            Self::Apply => "apply",
            Self::Prospectus => "prospectus",
            Self::Demo => "demo",
            Self::Contact => "contact",
            Self::Calculate => "calculate",
            Self::Download => "download",
            Self::External => "external",
            Self::Admissions => "admissions",
            Self::Browsing => "browsing",
            Self::Other(tag) => tag,
        }
    }

    /// Intents that make a click meaningful.
    pub fn is_high_intent(&self) -> bool {
        matches!(
            self,
            Self::BookVisit
                | Self::Enquire
                | Self::Apply
                | Self::Prospectus
                | Self::Demo
                | Self::Contact
                | Self::Calculate
                | Self::Download
                | Self::External
        )
    }
}

impl From<String> for IntentType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "book_visit" => Self::BookVisit,
            "enquire" => Self::Enquire,
            "apply" => Self::Apply,
            "prospectus" => Self::Prospectus,
            "demo" => Self::Demo,
            "contact" => Self::Contact,
            "calculate" => Self::Calculate,
            "download" => Self::Download,
            "external" => Self::External,
            "admissions" => Self::Admissions,
            "browsing" => Self::Browsing,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for IntentType {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<IntentType> for String {
    fn from(intent: IntentType) -> Self {
        match intent {
            IntentType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

// =============================================================================
// Metadata payload
// =============================================================================

/// Client-reported automation indicators.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientIndicators {
    /// `navigator.webdriver` was true
    #[serde(deserialize_with = "lenient_bool")]
    pub webdriver: Option<bool>,
    /// Number of navigator plugins
    #[serde(deserialize_with = "lenient_u32")]
    pub plugins_count: Option<u32>,
    /// Number of navigator languages
    #[serde(deserialize_with = "lenient_u32")]
    pub languages_count: Option<u32>,
    /// Permissions API reported a state inconsistent with the notification permission
    #[serde(deserialize_with = "lenient_bool")]
    pub permissions_mismatch: Option<bool>,
    /// Automation framework globals found on `window`
    #[serde(deserialize_with = "lenient_strings")]
    pub automation_globals: Vec<String>,
}

/// Browser fingerprint summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintSummary {
    #[serde(deserialize_with = "lenient_string")]
    pub canvas_hash: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub canvas_suspicious: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub webgl_renderer: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub webgl_suspicious: Option<bool>,
    #[serde(deserialize_with = "lenient_u32")]
    pub screen_width: Option<u32>,
    #[serde(deserialize_with = "lenient_u32")]
    pub screen_height: Option<u32>,
}

/// Mouse movement summary collected client-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MouseSummary {
    #[serde(deserialize_with = "lenient_u32")]
    pub movement_count: Option<u32>,
    /// Fraction (0-1) of movement segments that are perfectly straight
    #[serde(deserialize_with = "lenient_f64")]
    pub straight_line_ratio: Option<f64>,
    /// Standard deviation of inter-move intervals in milliseconds
    #[serde(deserialize_with = "lenient_f64")]
    pub timing_stddev_ms: Option<f64>,
    /// Cursor jumps with no intermediate positions
    #[serde(deserialize_with = "lenient_u32")]
    pub teleport_count: Option<u32>,
}

/// Scroll behaviour summary collected client-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollSummary {
    #[serde(deserialize_with = "lenient_u32")]
    pub scroll_count: Option<u32>,
    /// Standard deviation of inter-scroll intervals in milliseconds
    #[serde(deserialize_with = "lenient_f64")]
    pub timing_stddev_ms: Option<f64>,
    #[serde(deserialize_with = "lenient_u32")]
    pub direction_changes: Option<u32>,
    #[serde(deserialize_with = "lenient_f64")]
    pub max_speed_px_per_sec: Option<f64>,
}

/// JavaScript challenge outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeResult {
    #[serde(deserialize_with = "lenient_bool")]
    pub passed: Option<bool>,
    #[serde(deserialize_with = "lenient_f64")]
    pub solve_time_ms: Option<f64>,
}

/// Semi-structured event payload.
///
/// Only keys the heuristics read are modelled; everything else in the
/// client payload is ignored on deserialization. A modelled key holding a
/// value of the wrong shape reads as absent without affecting its siblings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMetadata {
    /// Scroll depth percentage (`scroll_depth` events)
    #[serde(deserialize_with = "lenient_f64")]
    pub depth: Option<f64>,
    /// Field name (`form_field_blur` events)
    #[serde(deserialize_with = "lenient_string")]
    pub field_name: Option<String>,
    /// Whether the blurred field held a value
    #[serde(deserialize_with = "lenient_bool")]
    pub completed: Option<bool>,
    /// Fields completed at abandonment (`form_abandon` events)
    #[serde(deserialize_with = "lenient_u32")]
    pub fields_completed: Option<u32>,
    #[serde(deserialize_with = "lenient_string")]
    pub form_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub form_label: Option<String>,
    /// Visitor interacted with a hidden honeypot element
    #[serde(deserialize_with = "lenient_bool")]
    pub honeypot_triggered: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub client_indicators: Option<ClientIndicators>,
    #[serde(deserialize_with = "lenient")]
    pub fingerprint: Option<FingerprintSummary>,
    #[serde(deserialize_with = "lenient")]
    pub mouse: Option<MouseSummary>,
    #[serde(deserialize_with = "lenient")]
    pub scroll: Option<ScrollSummary>,
    #[serde(deserialize_with = "lenient")]
    pub challenge: Option<ChallengeResult>,
}

impl EventMetadata {
    /// Parse a stored JSON payload, degrading to empty metadata.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(raw)
    }

    /// Whether any behavioural or automation summary is present.
    pub fn has_client_signals(&self) -> bool {
        self.client_indicators.is_some()
            || self.fingerprint.is_some()
            || self.mouse.is_some()
            || self.scroll.is_some()
            || self.challenge.is_some()
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let number = value.and_then(|v| match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    });
    Ok(number.filter(|n| n.is_finite()))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_f64(deserializer)?;
    Ok(value
        .filter(|n| *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) => Some(s),
        _ => None,
    }))
}

fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Nested summary; anything but an object reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}

// =============================================================================
// Event
// =============================================================================

/// A single observed interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Opaque event ID
    pub id: String,
    /// Journey/session identifier assigned by the client
    pub session_id: String,
    pub visitor_id: Option<String>,
    pub site_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub event_type: EventType,
    pub page_url: Option<String>,
    pub referrer: Option<String>,
    pub intent_type: Option<IntentType>,
    pub cta_label: Option<String>,
    pub device_type: Option<String>,
    /// Client timestamp; `None` when missing or malformed
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl Event {
    /// Creates an event with only the ordering-relevant fields set.
    pub fn new(
        id: impl Into<String>,
        session_id: impl Into<String>,
        event_type: impl Into<EventType>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            session_id: session_id.into(),
            visitor_id: None,
            site_id: None,
            ip_address: None,
            user_agent: None,
            event_type: event_type.into(),
            page_url: None,
            referrer: None,
            intent_type: None,
            cta_label: None,
            device_type: None,
            occurred_at: Some(occurred_at),
            metadata: EventMetadata::default(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.page_url = Some(url.into());
        self
    }

    pub fn with_intent(mut self, intent: impl Into<IntentType>) -> Self {
        self.intent_type = Some(intent.into());
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_visitor(mut self, visitor_id: impl Into<String>) -> Self {
        self.visitor_id = Some(visitor_id.into());
        self
    }

    pub fn with_site(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = Some(site_id.into());
        self
    }

    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Whether the event carries a usable IP address.
    pub fn has_ip(&self) -> bool {
        self.ip_address
            .as_deref()
            .is_some_and(|ip| !ip.trim().is_empty())
    }
}
