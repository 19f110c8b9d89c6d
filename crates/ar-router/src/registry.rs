//! Capability registry: handler descriptors bound to their implementations.
//!
//! Resolved once at startup. Declaration order is significant: the intent
//! classifier breaks match-count ties in favour of the earlier handler.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use ar_protocol::{HandlerDescriptor, HandlerSummary};

use crate::error::{RouterError, RouterResult};
use crate::handler::Handler;

/// A descriptor and the handler that serves it.
#[derive(Clone)]
pub struct RegisteredHandler {
    pub descriptor: HandlerDescriptor,
    pub handler: Arc<dyn Handler>,
}

impl RegisteredHandler {
    pub fn new(descriptor: HandlerDescriptor, handler: Arc<dyn Handler>) -> Self {
        Self {
            descriptor,
            handler,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

impl std::fmt::Debug for RegisteredHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHandler")
            .field("descriptor", &self.descriptor)
            .field("backend", &self.handler.backend_name())
            .finish()
    }
}

/// Registry of all capability handlers, indexed by id.
#[derive(Debug)]
pub struct CapabilityRegistry {
    entries: Vec<RegisteredHandler>,
    /// Map from handler id → index into `entries`.
    index: HashMap<String, usize>,
    fallback: usize,
}

impl CapabilityRegistry {
    /// Build a registry, checking that ids are unique, exactly one handler
    /// is the fallback, and every specialized handler has trigger terms.
    pub fn new(entries: Vec<RegisteredHandler>) -> RouterResult<Self> {
        let mut index = HashMap::new();
        let mut fallback = None;

        for (i, entry) in entries.iter().enumerate() {
            let d = &entry.descriptor;
            if d.id.trim().is_empty() {
                return Err(RouterError::Registry("handler id must not be empty".into()));
            }
            if index.insert(d.id.clone(), i).is_some() {
                return Err(RouterError::Registry(format!("duplicate handler id: {}", d.id)));
            }
            if d.is_fallback {
                if let Some(prev) = fallback {
                    let prev: &RegisteredHandler = &entries[prev];
                    return Err(RouterError::Registry(format!(
                        "more than one fallback handler: {} and {}",
                        prev.id(),
                        d.id
                    )));
                }
                fallback = Some(i);
            } else if d.trigger_terms.iter().all(|t| t.trim().is_empty()) {
                return Err(RouterError::Registry(format!(
                    "specialized handler {} has no trigger terms",
                    d.id
                )));
            }
        }

        let fallback = fallback
            .ok_or_else(|| RouterError::Registry("no fallback handler registered".into()))?;

        Ok(Self {
            entries,
            index,
            fallback,
        })
    }

    /// Look up a handler by id.
    pub fn lookup(&self, id: &str) -> Option<&RegisteredHandler> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The designated general-purpose fallback handler.
    pub fn fallback(&self) -> &RegisteredHandler {
        &self.entries[self.fallback]
    }

    /// Specialized handlers in declaration order.
    pub fn specialized(&self) -> impl Iterator<Item = &RegisteredHandler> {
        self.entries.iter().filter(|e| !e.descriptor.is_fallback)
    }

    /// All handlers in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredHandler> {
        self.entries.iter()
    }

    /// Handler ids in declaration order.
    pub fn ids(&self) -> Vec<&str> {
        self.entries.iter().map(RegisteredHandler::id).collect()
    }

    /// Registry listing for the help/status command.
    pub fn summaries(&self) -> Vec<HandlerSummary> {
        self.entries
            .iter()
            .map(|e| HandlerSummary {
                id: e.descriptor.id.clone(),
                description: e.descriptor.description.clone(),
                family: e.descriptor.family,
                trigger_term_count: e.descriptor.trigger_terms.len(),
                is_fallback: e.descriptor.is_fallback,
            })
            .collect()
    }

    /// Example requests of every handler that declares some.
    pub fn usage_examples(&self) -> BTreeMap<String, Vec<String>> {
        self.entries
            .iter()
            .filter(|e| !e.descriptor.examples.is_empty())
            .map(|e| (e.descriptor.id.clone(), e.descriptor.examples.clone()))
            .collect()
    }

    /// Total number of registered handlers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockHandler;
    use ar_protocol::HandlerFamily;

    fn entry(descriptor: HandlerDescriptor) -> RegisteredHandler {
        RegisteredHandler::new(descriptor, Arc::new(MockHandler::new()))
    }

    fn resource() -> HandlerDescriptor {
        HandlerDescriptor::specialized(
            "aws_resource_tool",
            "Retrieves AWS resource information",
            HandlerFamily::ResourceQuery,
            ["ec2", "vpc", "how many"],
        )
        .with_examples(["List S3 buckets"])
    }

    fn network() -> HandlerDescriptor {
        HandlerDescriptor::specialized(
            "network_troubleshoot_tool",
            "Diagnoses network connectivity",
            HandlerFamily::Diagnostics,
            ["ping", "dns", "timeout"],
        )
    }

    fn general() -> HandlerDescriptor {
        HandlerDescriptor::fallback("general_llm_tool", "Handles any question")
    }

    #[test]
    fn builds_and_indexes() {
        let reg =
            CapabilityRegistry::new(vec![entry(resource()), entry(network()), entry(general())])
                .unwrap();
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.fallback().id(), "general_llm_tool");
        assert!(reg.lookup("network_troubleshoot_tool").is_some());
        assert!(reg.lookup("nonexistent_tool").is_none());
        let specialized: Vec<&str> = reg.specialized().map(RegisteredHandler::id).collect();
        assert_eq!(
            specialized,
            vec!["aws_resource_tool", "network_troubleshoot_tool"]
        );
    }

    #[test]
    fn rejects_missing_fallback() {
        let err = CapabilityRegistry::new(vec![entry(resource())]).unwrap_err();
        assert!(err.to_string().contains("no fallback"));
    }

    #[test]
    fn rejects_two_fallbacks() {
        let other = HandlerDescriptor::fallback("second_llm", "Another fallback");
        let err = CapabilityRegistry::new(vec![entry(general()), entry(other)]).unwrap_err();
        assert!(err.to_string().contains("more than one fallback"));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err =
            CapabilityRegistry::new(vec![entry(resource()), entry(resource()), entry(general())])
                .unwrap_err();
        assert!(err.to_string().contains("duplicate handler id"));
    }

    #[test]
    fn rejects_specialized_without_terms() {
        let bare = HandlerDescriptor::specialized(
            "bare_tool",
            "No terms",
            HandlerFamily::General,
            Vec::<String>::new(),
        );
        let err = CapabilityRegistry::new(vec![entry(bare), entry(general())]).unwrap_err();
        assert!(err.to_string().contains("no trigger terms"));
    }

    #[test]
    fn summaries_and_examples() {
        let reg = CapabilityRegistry::new(vec![entry(resource()), entry(general())]).unwrap();
        let summaries = reg.summaries();
        assert_eq!(summaries[0].trigger_term_count, 3);
        assert!(summaries[1].is_fallback);

        let examples = reg.usage_examples();
        assert_eq!(examples.len(), 1);
        assert_eq!(examples["aws_resource_tool"], vec!["List S3 buckets"]);
    }
}
