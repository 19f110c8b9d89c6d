//! Keyword intent classifier.
//!
//! Scores a request against every specialized handler's trigger terms by
//! case-insensitive substring containment. Each distinct term counts once,
//! however often it appears. Pure function of the registry and the text.

use ar_protocol::IntentScore;

use crate::registry::CapabilityRegistry;

/// Ranked classifier output for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Scores sorted by descending match count; ties keep registry order.
    pub ranked: Vec<IntentScore>,
    /// Sum of match counts across all specialized handlers.
    pub total_matches: usize,
}

impl Classification {
    /// Highest-scoring handler (first declared on ties).
    pub fn best(&self) -> Option<&IntentScore> {
        self.ranked.first()
    }

    /// Whether no trigger term of any handler matched.
    pub fn is_empty(&self) -> bool {
        self.total_matches == 0
    }

    pub fn score_for(&self, handler_id: &str) -> Option<&IntentScore> {
        self.ranked.iter().find(|s| s.handler_id == handler_id)
    }
}

/// Score `text` against every specialized handler in `registry`.
pub fn classify(registry: &CapabilityRegistry, text: &str) -> Classification {
    let lower = text.to_lowercase();

    let mut ranked: Vec<IntentScore> = registry
        .specialized()
        .map(|entry| {
            let matched_terms = matching_terms(&lower, &entry.descriptor.trigger_terms);
            IntentScore {
                handler_id: entry.descriptor.id.clone(),
                match_count: matched_terms.len(),
                matched_terms,
                normalized_confidence: 0.0,
            }
        })
        .collect();

    let total_matches: usize = ranked.iter().map(|s| s.match_count).sum();
    if total_matches > 0 {
        for score in &mut ranked {
            score.normalized_confidence = score.match_count as f64 / total_matches as f64;
        }
    }

    // Stable sort: equal counts stay in declaration order.
    ranked.sort_by(|a, b| b.match_count.cmp(&a.match_count));

    Classification {
        ranked,
        total_matches,
    }
}

/// Distinct trigger terms contained in the (already lowercased) text.
fn matching_terms(lower: &str, terms: &[String]) -> Vec<String> {
    let mut matched: Vec<String> = Vec::new();
    for term in terms {
        let term = term.trim().to_lowercase();
        if term.is_empty() || matched.contains(&term) {
            continue;
        }
        if lower.contains(&term) {
            matched.push(term);
        }
    }
    matched
}
