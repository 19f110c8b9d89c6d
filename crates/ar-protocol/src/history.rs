use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::intent::FallbackReason;

/// Record of one completed routing cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// UUIDv7, so ids sort the same way as timestamps.
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub request_text: String,
    /// Handler that produced the final answer (or was last considered).
    pub selected_handler_id: String,
    pub confidence: f64,
    pub is_fallback: bool,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    /// Specialized handler that was tried first when the cycle escalated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempted_handler_id: Option<String>,
}

impl RoutingDecision {
    pub fn new(
        request_text: impl Into<String>,
        selected_handler_id: impl Into<String>,
        confidence: f64,
        is_fallback: bool,
        succeeded: bool,
        fallback_reason: Option<FallbackReason>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            request_text: request_text.into(),
            selected_handler_id: selected_handler_id.into(),
            confidence,
            is_fallback,
            succeeded,
            fallback_reason,
            attempted_handler_id: None,
        }
    }

    pub fn with_attempted(mut self, handler_id: impl Into<String>) -> Self {
        self.attempted_handler_id = Some(handler_id.into());
        self
    }
}

/// Explicit user feedback on a routing decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedbackEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub request_text: String,
    pub selected_handler_id: String,
    pub was_helpful: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl UserFeedbackEntry {
    pub fn new(
        request_text: impl Into<String>,
        selected_handler_id: impl Into<String>,
        was_helpful: bool,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            timestamp: Utc::now(),
            request_text: request_text.into(),
            selected_handler_id: selected_handler_id.into(),
            was_helpful,
            comment,
        }
    }
}

/// One entry of the learning log, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEntry {
    RoutingDecision(RoutingDecision),
    UserFeedback(UserFeedbackEntry),
}

impl HistoryEntry {
    pub fn request_text(&self) -> &str {
        match self {
            Self::RoutingDecision(d) => &d.request_text,
            Self::UserFeedback(f) => &f.request_text,
        }
    }

    pub fn handler_id(&self) -> &str {
        match self {
            Self::RoutingDecision(d) => &d.selected_handler_id,
            Self::UserFeedback(f) => &f.selected_handler_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::RoutingDecision(d) => d.timestamp,
            Self::UserFeedback(f) => f.timestamp,
        }
    }

    /// Whether the entry reports a good outcome: a successful cycle, or
    /// feedback marked helpful.
    pub fn succeeded(&self) -> bool {
        match self {
            Self::RoutingDecision(d) => d.succeeded,
            Self::UserFeedback(f) => f.was_helpful,
        }
    }

    pub fn is_fallback(&self) -> bool {
        match self {
            Self::RoutingDecision(d) => d.is_fallback,
            Self::UserFeedback(_) => false,
        }
    }

    pub fn as_decision(&self) -> Option<&RoutingDecision> {
        match self {
            Self::RoutingDecision(d) => Some(d),
            Self::UserFeedback(_) => None,
        }
    }
}

impl From<RoutingDecision> for HistoryEntry {
    fn from(d: RoutingDecision) -> Self {
        Self::RoutingDecision(d)
    }
}

impl From<UserFeedbackEntry> for HistoryEntry {
    fn from(f: UserFeedbackEntry) -> Self {
        Self::UserFeedback(f)
    }
}

/// On-disk layout of the learning log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryFile {
    pub routing_history: Vec<HistoryEntry>,
    pub last_updated: DateTime<Utc>,
}
