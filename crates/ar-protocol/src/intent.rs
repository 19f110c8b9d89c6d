use serde::{Deserialize, Serialize};

/// Score of one specialized handler against one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentScore {
    pub handler_id: String,
    /// Number of distinct trigger terms found in the request.
    pub match_count: usize,
    /// Matched trigger terms, in trigger declaration order.
    pub matched_terms: Vec<String>,
    /// `match_count` divided by the total across all specialized handlers
    /// (0.0 when nothing matched).
    pub normalized_confidence: f64,
}

/// Why a request ended up on the fallback handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Some trigger terms matched but the selection gate was not cleared.
    LowConfidence,
    /// No trigger term of any handler matched.
    NoKeywordsMatched,
    /// The specialized handler raised, timed out, or returned an error marker.
    AgentError,
    /// The specialized handler answered but its output failed validation.
    IrrelevantResponse,
}

impl FallbackReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LowConfidence => "low_confidence",
            Self::NoKeywordsMatched => "no_keywords_matched",
            Self::AgentError => "agent_error",
            Self::IrrelevantResponse => "irrelevant_response",
        }
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_reason_serialization() {
        assert_eq!(
            serde_json::to_string(&FallbackReason::NoKeywordsMatched).unwrap(),
            r#""no_keywords_matched""#
        );
        assert_eq!(
            serde_json::to_string(&FallbackReason::IrrelevantResponse).unwrap(),
            r#""irrelevant_response""#
        );
    }

    #[test]
    fn display_matches_wire_name() {
        for reason in [
            FallbackReason::LowConfidence,
            FallbackReason::NoKeywordsMatched,
            FallbackReason::AgentError,
            FallbackReason::IrrelevantResponse,
        ] {
            let wire = serde_json::to_string(&reason).unwrap();
            assert_eq!(wire.trim_matches('"'), reason.to_string());
        }
    }
}
