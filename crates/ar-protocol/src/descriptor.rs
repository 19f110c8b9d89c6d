use serde::{Deserialize, Serialize};

/// Which family of capability a handler belongs to.
///
/// The response validator picks its relevance rules by family, so two
/// resource-query handlers (say EC2 and RDS backends) share one rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HandlerFamily {
    /// Cloud resource lookups ("how many VPCs", "list S3 buckets").
    ResourceQuery,
    /// Connectivity and troubleshooting diagnostics.
    Diagnostics,
    /// Anything without a dedicated relevance rule (including the fallback).
    #[default]
    General,
}

/// Static description of a capability handler.
///
/// Built once at startup from configuration and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    /// Unique handler identifier (e.g., "aws_resource_tool").
    pub id: String,
    /// One-line description shown in system info.
    pub description: String,
    /// Relevance rule family.
    #[serde(default)]
    pub family: HandlerFamily,
    /// Ordered trigger terms used for intent scoring.
    /// Empty only for the fallback handler.
    #[serde(default)]
    pub trigger_terms: Vec<String>,
    /// Whether this is the designated general-purpose fallback.
    #[serde(default)]
    pub is_fallback: bool,
    /// Sample requests shown in help output and unclear-intent replies.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl HandlerDescriptor {
    /// Describe a specialized handler with its trigger terms.
    pub fn specialized<I, S>(
        id: impl Into<String>,
        description: impl Into<String>,
        family: HandlerFamily,
        trigger_terms: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            description: description.into(),
            family,
            trigger_terms: trigger_terms.into_iter().map(Into::into).collect(),
            is_fallback: false,
            examples: Vec::new(),
        }
    }

    /// Describe the general-purpose fallback handler.
    pub fn fallback(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            family: HandlerFamily::General,
            trigger_terms: Vec::new(),
            is_fallback: true,
            examples: Vec::new(),
        }
    }

    pub fn with_examples<I, S>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }
}
