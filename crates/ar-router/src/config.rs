//! Routing and learning-store tuning, loadable from TOML.
//!
//! The thresholds are empirical defaults, not derived values; deployments
//! are expected to tune them.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Selection gate, escalation, and validation toggles.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Minimum normalized confidence for a specialized handler.
    #[serde(default = "default_min_confidence")]
    pub min_confidence_threshold: f64,
    /// Minimum distinct trigger-term matches for a specialized handler.
    #[serde(default = "default_min_keyword_matches")]
    pub min_keyword_matches: usize,
    /// Route to the general-purpose handler when nothing qualifies.
    #[serde(default = "default_true")]
    pub enable_fallback: bool,
    /// Escalate to the fallback when a specialized handler errors.
    #[serde(default = "default_true")]
    pub fallback_for_errors: bool,
    /// Run the response validator on specialized answers.
    #[serde(default = "default_true")]
    pub validate_responses: bool,
    /// Record routing decisions in the learning store.
    #[serde(default = "default_true")]
    pub learning_enabled: bool,
    /// Per-invocation handler deadline in seconds.
    #[serde(default = "default_handler_timeout")]
    pub handler_timeout_secs: u64,
}

fn default_min_confidence() -> f64 {
    0.5
}
fn default_min_keyword_matches() -> usize {
    2
}
fn default_true() -> bool {
    true
}
fn default_handler_timeout() -> u64 {
    30
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            min_confidence_threshold: default_min_confidence(),
            min_keyword_matches: default_min_keyword_matches(),
            enable_fallback: true,
            fallback_for_errors: true,
            validate_responses: true,
            learning_enabled: true,
            handler_timeout_secs: default_handler_timeout(),
        }
    }
}

impl RoutingConfig {
    pub fn handler_timeout(&self) -> Duration {
        Duration::from_secs(self.handler_timeout_secs)
    }
}

/// Hard upper bound on retained history, whatever `retention` says.
pub const MAX_RETAINED: usize = 1000;

/// Learning store retention, similarity search, and persistence cadence.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// History file. None keeps the log in memory only.
    #[serde(default = "default_path")]
    pub path: Option<PathBuf>,
    /// Maximum retained entries (oldest evicted first), capped at
    /// [`MAX_RETAINED`].
    #[serde(default = "default_retention")]
    pub retention: usize,
    /// How many recent entries a similarity search scans.
    #[serde(default = "default_similarity_window")]
    pub similarity_window: usize,
    /// Minimum Jaccard similarity for a past request to count as similar.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    /// How many similar requests a recommendation lists.
    #[serde(default = "default_recommendation_limit")]
    pub recommendation_limit: usize,
    /// Unsaved appends that wake the background flusher early.
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,
    /// Background flush interval in seconds.
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

fn default_path() -> Option<PathBuf> {
    Some(PathBuf::from("routing_history.json"))
}
fn default_retention() -> usize {
    1000
}
fn default_similarity_window() -> usize {
    100
}
fn default_similarity_threshold() -> f64 {
    0.3
}
fn default_recommendation_limit() -> usize {
    5
}
fn default_flush_every() -> usize {
    10
}
fn default_flush_interval() -> u64 {
    30
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            retention: default_retention(),
            similarity_window: default_similarity_window(),
            similarity_threshold: default_similarity_threshold(),
            recommendation_limit: default_recommendation_limit(),
            flush_every: default_flush_every(),
            flush_interval_secs: default_flush_interval(),
        }
    }
}

impl StoreConfig {
    /// In-memory store with default tuning (tests, dry runs).
    pub fn in_memory() -> Self {
        Self {
            path: None,
            ..Self::default()
        }
    }

    /// Effective retention bound.
    pub fn retention_limit(&self) -> usize {
        self.retention.min(MAX_RETAINED)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }
}
