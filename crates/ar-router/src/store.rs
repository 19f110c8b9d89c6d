//! Feedback & learning store.
//!
//! An append-only, time-ordered log of routing decisions and user feedback,
//! bounded to the most recent `retention` entries (oldest evicted first).
//! Appends take the write lock, so order and the retention bound hold under
//! concurrent routing; reads work on a consistent snapshot under the read
//! lock. Persistence is a single pretty-printed JSON record, written by a
//! background flusher or explicitly by "save-now" callers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Notify, RwLock};
use tokio::time::{self, MissedTickBehavior};

use ar_protocol::{
    FallbackReason, FeedbackSummary, HistoryEntry, HistoryFile, RoutingRecommendations,
    RoutingReport, SimilarRequest,
};

use crate::config::{MAX_RETAINED, StoreConfig};
use crate::error::{StoreError, StoreResult};

/// Fallback rate above which analytics suggests retuning.
const HIGH_FALLBACK_RATE: f64 = 0.3;

struct StoreState {
    entries: VecDeque<HistoryEntry>,
    /// Appends not yet written to durable storage.
    unsaved: usize,
}

/// Bounded, persisted routing history shared by all request pipelines.
pub struct FeedbackStore {
    config: StoreConfig,
    state: RwLock<StoreState>,
    /// Serializes file writes so an older snapshot never overwrites a newer one.
    write_lock: Mutex<()>,
    flush_signal: Notify,
}

impl FeedbackStore {
    pub fn new(config: StoreConfig) -> Self {
        if config.retention > MAX_RETAINED {
            tracing::warn!(
                configured = config.retention,
                max = MAX_RETAINED,
                "history retention capped"
            );
        }
        Self {
            config,
            state: RwLock::new(StoreState {
                entries: VecDeque::new(),
                unsaved: 0,
            }),
            write_lock: Mutex::new(()),
            flush_signal: Notify::new(),
        }
    }

    /// Store without durable storage.
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::in_memory())
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Replace the in-memory log with the persisted one, keeping only the
    /// most recent `retention` entries. A missing file is an empty history.
    pub async fn load_on_startup(&self) -> StoreResult<usize> {
        let Some(path) = self.config.path.as_deref() else {
            return Ok(0);
        };

        let contents = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no routing history yet");
                return Ok(0);
            }
            Err(e) => return Err(StoreError::Io(format!("{}: {e}", path.display()))),
        };

        let file: HistoryFile = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Encoding(format!("{}: {e}", path.display())))?;

        let mut entries: VecDeque<HistoryEntry> = file.routing_history.into();
        let dropped = entries.len().saturating_sub(self.config.retention_limit());
        entries.drain(..dropped);
        let count = entries.len();

        let mut state = self.state.write().await;
        state.entries = entries;
        state.unsaved = 0;

        tracing::info!(
            count,
            dropped,
            path = %path.display(),
            "loaded routing history"
        );
        Ok(count)
    }

    /// Append an entry, evicting the oldest beyond the retention bound.
    ///
    /// Durable storage is updated later by the background flusher; it is
    /// woken early once `flush_every` appends are pending.
    pub async fn append(&self, entry: impl Into<HistoryEntry>) {
        let mut state = self.state.write().await;
        state.entries.push_back(entry.into());
        let limit = self.config.retention_limit();
        while state.entries.len() > limit {
            state.entries.pop_front();
        }
        state.unsaved += 1;
        let due = self.config.path.is_some() && state.unsaved >= self.config.flush_every.max(1);
        drop(state);

        if due {
            self.flush_signal.notify_one();
        }
    }

    /// Append and write through to durable storage before returning.
    ///
    /// The entry stays in memory even if the write fails.
    pub async fn append_and_flush(&self, entry: impl Into<HistoryEntry>) -> StoreResult<()> {
        self.append(entry).await;
        self.flush().await
    }

    /// Write a snapshot of the log to durable storage.
    pub async fn flush(&self) -> StoreResult<()> {
        let Some(path) = self.config.path.as_deref() else {
            self.state.write().await.unsaved = 0;
            return Ok(());
        };

        let _guard = self.write_lock.lock().await;

        let (routing_history, pending) = {
            let state = self.state.read().await;
            (state.entries.iter().cloned().collect::<Vec<_>>(), state.unsaved)
        };
        let count = routing_history.len();

        let file = HistoryFile {
            routing_history,
            last_updated: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&file)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;
        write_atomic(path, json.as_bytes()).await?;

        let mut state = self.state.write().await;
        state.unsaved = state.unsaved.saturating_sub(pending);
        drop(state);

        tracing::debug!(count, path = %path.display(), "routing history flushed");
        Ok(())
    }

    /// Flush whenever `flush_every` appends are pending or `interval`
    /// elapses with unsaved entries. Runs until the task is dropped.
    pub async fn run_flusher(&self, interval: Duration) {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // Skip the first tick (fires immediately).
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                () = self.flush_signal.notified() => {}
            }

            if self.unsaved().await == 0 {
                continue;
            }
            if let Err(e) = self.flush().await {
                tracing::warn!(error = %e, "history flush failed, entries kept in memory");
            }
        }
    }

    /// Number of appends not yet written to durable storage.
    pub async fn unsaved(&self) -> usize {
        self.state.read().await.unsaved
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// The most recent `n` entries, oldest first.
    pub async fn recent_entries(&self, n: usize) -> Vec<HistoryEntry> {
        let state = self.state.read().await;
        let start = state.entries.len().saturating_sub(n);
        state.entries.range(start..).cloned().collect()
    }

    /// Past requests among the most recent `window` entries whose Jaccard
    /// token similarity to `text` is at least `threshold`, most similar first.
    pub async fn similar_to(
        &self,
        text: &str,
        window: usize,
        threshold: f64,
    ) -> Vec<SimilarRequest> {
        let query = tokens(text);
        let state = self.state.read().await;
        let start = state.entries.len().saturating_sub(window);

        let mut similar: Vec<SimilarRequest> = state
            .entries
            .range(start..)
            .filter_map(|entry| {
                let similarity = jaccard(&query, &tokens(entry.request_text()));
                (similarity >= threshold).then(|| SimilarRequest {
                    request_text: entry.request_text().to_string(),
                    similarity,
                    selected_handler_id: entry.handler_id().to_string(),
                    succeeded: entry.succeeded(),
                    is_fallback: entry.is_fallback(),
                })
            })
            .collect();

        similar.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        similar
    }

    /// Similar past requests plus the handler that served them best.
    pub async fn recommend(&self, text: &str) -> RoutingRecommendations {
        let similar = self
            .similar_to(
                text,
                self.config.similarity_window,
                self.config.similarity_threshold,
            )
            .await;

        let mut recommendations = Vec::new();
        if let Some(best) = most_successful_handler(&similar) {
            recommendations.push(format!(
                "Similar requests were most successful with: {best}"
            ));
        }

        RoutingRecommendations {
            similar_requests_found: similar.len(),
            top_similar: similar
                .into_iter()
                .take(self.config.recommendation_limit)
                .collect(),
            recommendations,
        }
    }

    /// Aggregate statistics over the retained log. Read-only.
    pub async fn analyze_routing_patterns(&self) -> RoutingReport {
        let state = self.state.read().await;
        let mut report = RoutingReport::default();
        let mut feedback = FeedbackSummary::default();
        let mut successes = 0usize;
        let mut fallbacks = 0usize;
        let mut irrelevant_failures = 0usize;

        for entry in &state.entries {
            match entry {
                HistoryEntry::RoutingDecision(d) => {
                    report.total_requests += 1;
                    if d.succeeded {
                        successes += 1;
                    }
                    if d.is_fallback {
                        fallbacks += 1;
                    }
                    let usage = report
                        .handler_usage
                        .entry(d.selected_handler_id.clone())
                        .or_default();
                    usage.count += 1;
                    if d.succeeded {
                        usage.success_count += 1;
                    }
                    if let Some(reason) = d.fallback_reason {
                        *report.fallback_reasons.entry(reason).or_insert(0) += 1;
                        if reason == FallbackReason::IrrelevantResponse && !d.succeeded {
                            irrelevant_failures += 1;
                        }
                    }
                }
                HistoryEntry::UserFeedback(f) => {
                    if f.was_helpful {
                        feedback.helpful += 1;
                    } else {
                        feedback.not_helpful += 1;
                    }
                }
            }
        }
        report.feedback = feedback;

        if report.total_requests == 0 {
            report.message = Some("No routing history available".into());
            return report;
        }

        let total = report.total_requests as f64;
        report.success_rate = successes as f64 / total;
        report.fallback_rate = fallbacks as f64 / total;

        if report.fallback_rate > HIGH_FALLBACK_RATE {
            report.improvement_suggestions.push(
                "High fallback rate detected. Consider expanding specialized handler trigger terms or adjusting the routing thresholds.".into(),
            );
        }
        if irrelevant_failures > 0 {
            report.improvement_suggestions.push(
                "Frequent irrelevant responses detected. Consider improving response validation or handler capabilities.".into(),
            );
        }
        if report.feedback.not_helpful > report.feedback.helpful {
            report.improvement_suggestions.push(
                "Users report more unhelpful than helpful answers. Review recent negative feedback.".into(),
            );
        }

        report
    }
}

/// Jaccard similarity of the lowercased whitespace token sets of two texts.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    jaccard(&tokens(a), &tokens(b))
}

fn tokens(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Handler with the most successful similar requests; ties go to the one
/// seen first (the most similar).
fn most_successful_handler(similar: &[SimilarRequest]) -> Option<&str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for req in similar.iter().filter(|r| r.succeeded) {
        let id = req.selected_handler_id.as_str();
        let count = counts.entry(id).or_insert(0);
        if *count == 0 {
            order.push(id);
        }
        *count += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for id in order {
        let count = counts[id];
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((id, count));
        }
    }
    best.map(|(id, _)| id)
}

/// Write through a temporary sibling file and rename over the target.
async fn write_atomic(path: &Path, bytes: &[u8]) -> StoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::Io(format!("{}: {e}", parent.display())))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::Io(format!("{}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))
}
