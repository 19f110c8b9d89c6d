use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::descriptor::HandlerFamily;
use crate::intent::{FallbackReason, IntentScore};
use crate::output::{HandlerOutput, ValidationResult};

/// Terminal state of a routing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    /// A handler (specialized or fallback) produced an answer.
    Succeeded,
    /// Nothing cleared the selection gate and fallback is disabled.
    Unclear,
    /// The selected handler failed and no escalation could recover it.
    Failed,
}

/// How the router arrived at its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingAnalysis {
    /// Handler that produced the final answer. None when no handler ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_handler: Option<String>,
    pub confidence: f64,
    pub is_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<FallbackReason>,
    /// Human-readable explanation ("Matched keywords: [...]").
    pub routing_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_validation: Option<ValidationResult>,
    /// Whether escalation context was handed to the fallback handler.
    pub context_provided: bool,
    /// Ranked classifier output for the request.
    #[serde(default)]
    pub intent_scores: Vec<IntentScore>,
}

/// Result of one routing cycle, as returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedResponse {
    pub status: CycleStatus,
    pub success: bool,
    pub analysis: RoutingAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<HandlerOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub fallback_attempted: bool,
    /// Usage examples keyed by handler id (unclear-intent replies only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub usage_examples: BTreeMap<String, Vec<String>>,
}

/// Per-handler usage counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandlerUsage {
    pub count: usize,
    pub success_count: usize,
}

/// Counts of explicit user feedback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub helpful: usize,
    pub not_helpful: usize,
}

/// Aggregate view over the retained routing log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingReport {
    pub total_requests: usize,
    pub success_rate: f64,
    pub fallback_rate: f64,
    pub handler_usage: BTreeMap<String, HandlerUsage>,
    pub fallback_reasons: BTreeMap<FallbackReason, usize>,
    pub feedback: FeedbackSummary,
    pub improvement_suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A past request found similar to the one being looked up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarRequest {
    pub request_text: String,
    pub similarity: f64,
    pub selected_handler_id: String,
    pub succeeded: bool,
    pub is_fallback: bool,
}

/// Answer to a "routing recommendations for: ..." command.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingRecommendations {
    pub similar_requests_found: usize,
    pub top_similar: Vec<SimilarRequest>,
    pub recommendations: Vec<String>,
}

/// Acknowledgement for submitted user feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAck {
    pub feedback_recorded: bool,
    /// False when the entry is held in memory only (store write failed).
    pub persisted: bool,
    pub suggestions: Vec<String>,
    pub message: String,
}

/// Registry entry as shown by the help/status command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerSummary {
    pub id: String,
    pub description: String,
    pub family: HandlerFamily,
    pub trigger_term_count: usize,
    pub is_fallback: bool,
}

/// Answer to the help/status command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub name: String,
    pub handlers: Vec<HandlerSummary>,
    pub usage_examples: BTreeMap<String, Vec<String>>,
    pub retained_history: usize,
}

/// Anything the request channel can answer with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RouterReply {
    Routed(Box<RoutedResponse>),
    Analysis(RoutingReport),
    Recommendations(RoutingRecommendations),
    SystemInfo(SystemInfo),
}
