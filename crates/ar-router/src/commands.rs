//! Special command surface.
//!
//! Requests on the routing channel that start with a command keyword skip
//! the classifier entirely and are answered from the learning store or
//! the registry.

use ar_protocol::RouterReply;

use crate::router::Router;

const ANALYZE_PREFIX: &str = "analyze routing";
const RECOMMEND_PREFIX: &str = "routing recommendations";

/// Whole-input phrases that ask for the registry listing.
const SYSTEM_INFO_PHRASES: &[&str] = &["help", "status", "available", "what can you do"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// `analyze routing ...`
    AnalyzeRouting,
    /// `routing recommendations [for][:] <query>`
    Recommendations(&'a str),
    /// `help`, `status`, ...
    SystemInfo,
    /// Anything else: a normal routing request.
    Route(&'a str),
}

pub fn parse_command(input: &str) -> Command<'_> {
    let trimmed = input.trim();

    if strip_prefix_ignore_case(trimmed, ANALYZE_PREFIX).is_some() {
        return Command::AnalyzeRouting;
    }

    if let Some(rest) = strip_prefix_ignore_case(trimmed, RECOMMEND_PREFIX) {
        let rest = rest.trim_start();
        let rest = match strip_prefix_ignore_case(rest, "for") {
            Some(after) if after.is_empty() || after.starts_with([':', ' ', '\t']) => after,
            _ => rest,
        };
        let rest = rest.trim_start();
        let rest = rest.strip_prefix(':').unwrap_or(rest);
        return Command::Recommendations(rest.trim());
    }

    let phrase = trimmed.trim_end_matches('?').trim_end();
    if SYSTEM_INFO_PHRASES
        .iter()
        .any(|p| phrase.eq_ignore_ascii_case(p))
    {
        return Command::SystemInfo;
    }

    Command::Route(trimmed)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

impl Router {
    /// Answer one line from the request channel: a command or a routed request.
    pub async fn handle(&self, input: &str) -> RouterReply {
        match parse_command(input) {
            Command::AnalyzeRouting => {
                tracing::info!("routing analysis requested");
                RouterReply::Analysis(self.store().analyze_routing_patterns().await)
            }
            Command::Recommendations(query) => {
                tracing::info!(query, "routing recommendations requested");
                RouterReply::Recommendations(self.store().recommend(query).await)
            }
            Command::SystemInfo => RouterReply::SystemInfo(self.system_info().await),
            Command::Route(text) => RouterReply::Routed(Box::new(self.route(text).await)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ar_protocol::{HandlerDescriptor, HandlerFamily, HandlerOutput};

    use crate::config::RoutingConfig;
    use crate::mock::MockHandler;
    use crate::registry::{CapabilityRegistry, RegisteredHandler};
    use crate::store::FeedbackStore;

    #[test]
    fn parses_analysis() {
        assert_eq!(parse_command("analyze routing"), Command::AnalyzeRouting);
        assert_eq!(parse_command("  Analyze Routing patterns"), Command::AnalyzeRouting);
    }

    #[test]
    fn parses_recommendations() {
        assert_eq!(
            parse_command("routing recommendations for: list s3 buckets"),
            Command::Recommendations("list s3 buckets")
        );
        assert_eq!(
            parse_command("Routing Recommendations: ping my host"),
            Command::Recommendations("ping my host")
        );
        assert_eq!(
            parse_command("routing recommendations for list ec2"),
            Command::Recommendations("list ec2")
        );
        assert_eq!(
            parse_command("routing recommendations forecast api"),
            Command::Recommendations("forecast api")
        );
        assert_eq!(parse_command("routing recommendations"), Command::Recommendations(""));
    }

    #[test]
    fn parses_system_info_only_as_whole_input() {
        assert_eq!(parse_command("help"), Command::SystemInfo);
        assert_eq!(parse_command("What can you do?"), Command::SystemInfo);
        assert_eq!(parse_command("STATUS"), Command::SystemInfo);
        assert_eq!(
            parse_command("status of my ec2 instances"),
            Command::Route("status of my ec2 instances")
        );
    }

    #[test]
    fn everything_else_is_routed() {
        assert_eq!(parse_command("  how many vpcs  "), Command::Route("how many vpcs"));
        assert_eq!(parse_command("analyze"), Command::Route("analyze"));
        assert_eq!(
            parse_command("ünïcode analyze routing"),
            Command::Route("ünïcode analyze routing")
        );
    }

    fn router() -> (Router, Arc<MockHandler>) {
        let resource = Arc::new(MockHandler::answering(HandlerOutput::from_value(
            serde_json::json!({"service": "s3", "resources": ["logs"]}),
        )));
        let registry = CapabilityRegistry::new(vec![
            RegisteredHandler::new(
                HandlerDescriptor::specialized(
                    "aws_resource_tool",
                    "resources",
                    HandlerFamily::ResourceQuery,
                    ["s3", "bucket", "list"],
                ),
                resource.clone(),
            ),
            RegisteredHandler::new(
                HandlerDescriptor::fallback("general_llm_tool", "anything"),
                Arc::new(MockHandler::new()),
            ),
        ])
        .unwrap();
        let router = Router::new(
            Arc::new(registry),
            Arc::new(FeedbackStore::in_memory()),
            RoutingConfig::default(),
        );
        (router, resource)
    }

    #[tokio::test]
    async fn commands_bypass_classifier() {
        let (router, resource) = router();
        router.handle("list s3 buckets").await;
        assert_eq!(resource.call_count(), 1);

        let reply = router.handle("routing recommendations for: list s3 bucket").await;
        let RouterReply::Recommendations(rec) = reply else {
            panic!("expected recommendations");
        };
        assert_eq!(rec.similar_requests_found, 1);
        assert_eq!(
            rec.recommendations,
            vec!["Similar requests were most successful with: aws_resource_tool"]
        );

        let reply = router.handle("analyze routing").await;
        let RouterReply::Analysis(report) = reply else {
            panic!("expected analysis");
        };
        assert_eq!(report.total_requests, 1);

        // Neither command invoked a handler or logged a decision.
        assert_eq!(resource.call_count(), 1);
        assert_eq!(router.store().len().await, 1);
    }

    #[tokio::test]
    async fn help_lists_handlers() {
        let (router, _) = router();
        let RouterReply::SystemInfo(info) = router.handle("help").await else {
            panic!("expected system info");
        };
        assert_eq!(info.handlers.len(), 2);
        assert!(router.store().is_empty().await);
    }

    #[tokio::test]
    async fn plain_requests_are_routed() {
        let (router, _) = router();
        let RouterReply::Routed(resp) = router.handle("list s3 buckets").await else {
            panic!("expected routed response");
        };
        assert!(resp.success);
        assert_eq!(resp.analysis.selected_handler.as_deref(), Some("aws_resource_tool"));
    }
}
