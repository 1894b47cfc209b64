//! Reconstructed visit-session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::events::IntentType;

/// Final classification of a journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    VisitBooked,
    EnquirySubmitted,
    FormEarlyAbandon,
    FormMidAbandon,
    FormNearCompleteAbandon,
    Engaged,
    NoAction,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VisitBooked => "visit_booked",
            Self::EnquirySubmitted => "enquiry_submitted",
            Self::FormEarlyAbandon => "form_early_abandon",
            Self::FormMidAbandon => "form_mid_abandon",
            Self::FormNearCompleteAbandon => "form_near_complete_abandon",
            Self::Engaged => "engaged",
            Self::NoAction => "no_action",
        }
    }

    /// Submit-driven outcomes.
    pub fn is_conversion(&self) -> bool {
        matches!(self, Self::VisitBooked | Self::EnquirySubmitted)
    }

    pub fn is_abandonment(&self) -> bool {
        matches!(
            self,
            Self::FormEarlyAbandon | Self::FormMidAbandon | Self::FormNearCompleteAbandon
        )
    }
}

/// Raw cause behind the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCause {
    FormSubmitted,
    FormAbandoned,
    ClickHighIntent,
    ClickLowIntent,
    None,
}

/// How strongly the session expressed intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStrength {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDetail {
    pub cause: OutcomeCause,
    pub intent_type: Option<IntentType>,
    pub strength: IntentStrength,
}

/// One page view in visit order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVisit {
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// A URL viewed more than once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopVisit {
    pub url: String,
    pub visit_count: u32,
}

/// Friction signal categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionKind {
    RageClick,
    ExitIntent,
    ConfusionLoop,
    RevisitLoop,
    RapidNavigation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrictionSignal {
    pub kind: FrictionKind,
    pub count: u32,
    /// URLs involved, when the signal is page-scoped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Friction {
    pub detected: bool,
    pub signals: Vec<FrictionSignal>,
    pub severity: Severity,
}

impl Friction {
    pub fn none() -> Self {
        Self {
            detected: false,
            signals: Vec::new(),
            severity: Severity::Low,
        }
    }

    pub fn has(&self, kind: FrictionKind) -> bool {
        self.signals.iter().any(|s| s.kind == kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct EngagementMetrics {
    #[validate(range(min = 0.0, max = 100.0))]
    pub max_scroll_pct: f64,
    /// Heartbeat-based estimate, not a measured duration
    pub dwell_seconds: u32,
    pub unique_pages: u32,
    pub section_count: u32,
    pub total_events: u32,
}

/// Automated-traffic family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotType {
    SearchEngine,
    SeoTool,
    Social,
    Monitoring,
    Automation,
    Scraper,
    Crawler,
    Honeypot,
    /// Flagged by behaviour or client signals alone
    Suspicious,
}

impl BotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SearchEngine => "search_engine",
            Self::SeoTool => "seo_tool",
            Self::Social => "social",
            Self::Monitoring => "monitoring",
            Self::Automation => "automation",
            Self::Scraper => "scraper",
            Self::Crawler => "crawler",
            Self::Honeypot => "honeypot",
            Self::Suspicious => "suspicious",
        }
    }

    /// Self-identifying crawler families.
    pub fn is_known_good(&self) -> bool {
        matches!(
            self,
            Self::SearchEngine | Self::SeoTool | Self::Social | Self::Monitoring
        )
    }
}

/// One reconstructed visit-session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Journey {
    pub journey_id: String,
    pub visitor_id: Option<String>,
    /// 1-based ordinal among the same visitor's (or IP's) sessions
    #[validate(range(min = 1))]
    pub visit_number: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub entry_page: Option<String>,
    pub entry_referrer: Option<String>,
    pub initial_intent: IntentType,
    pub page_sequence: Vec<PageVisit>,
    pub event_count: u32,
    pub outcome: Outcome,
    pub outcome_detail: OutcomeDetail,
    /// Seconds from the first event to the first action
    pub time_to_action: Option<i64>,
    pub loops: Vec<LoopVisit>,
    pub friction: Friction,
    #[validate(range(max = 100))]
    pub confidence: u8,
    #[validate(nested)]
    pub engagement_metrics: EngagementMetrics,
    pub is_bot: bool,
    #[validate(range(max = 100))]
    pub bot_score: u8,
    pub bot_type: Option<BotType>,
    pub bot_signals: Vec<String>,
    pub site_id: Option<String>,
    pub primary_ip_address: Option<String>,
}

impl Journey {
    /// Session length in whole seconds.
    pub fn duration_secs(&self) -> i64 {
        (self.last_seen - self.first_seen).num_seconds()
    }

    /// Checks range invariants before the journey is persisted.
    pub fn check(&self) -> crate::Result<()> {
        self.validate()
            .map_err(|e| crate::Error::validation(format!("journey {}: {}", self.journey_id, e)))?;
        if self.last_seen < self.first_seen {
            return Err(crate::Error::validation(format!(
                "journey {}: last_seen precedes first_seen",
                self.journey_id
            )));
        }
        Ok(())
    }
}
