//! General-purpose LLM handler, the router's fallback.
//!
//! A [`LanguageModel`] backend (Bedrock or Ollama) answers free-form
//! questions. When no backend is configured, or the backend fails or times
//! out, the handler degrades to a deterministic offline reply instead of
//! failing the request.

pub mod bedrock;
pub mod config;
pub mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::time::timeout;

use ar_protocol::HandlerOutput;
use ar_router::{FallbackContext, Handler, HandlerResult};

pub use config::{LlmConfig, LlmProvider};

/// Service tag carried by every answer of this handler.
pub const SERVICE_NAME: &str = "general_llm";

const OFFLINE_PROVIDER: &str = "offline";

/// A chat-style model backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Answer `prompt` under the `system` instructions.
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String>;

    /// Provider name (for logging/audit).
    fn provider_name(&self) -> &str;
}

pub struct GeneralLlmHandler {
    model: Option<Box<dyn LanguageModel>>,
    timeout: Duration,
}

impl GeneralLlmHandler {
    pub fn new(model: Option<Box<dyn LanguageModel>>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Handler that always answers with the offline reply.
    pub fn offline() -> Self {
        Self::new(None, Duration::from_secs(1))
    }

    /// Ask the model, or fall back to the offline reply. Returns the answer
    /// and the provider that produced it.
    async fn answer(&self, request: &str, system: &str) -> (String, String) {
        let Some(model) = self.model.as_deref() else {
            return (offline_reply(request), OFFLINE_PROVIDER.into());
        };
        let provider = model.provider_name();

        match timeout(self.timeout, model.complete(system, request)).await {
            Ok(Ok(text)) if !text.trim().is_empty() => (text, provider.to_string()),
            Ok(Ok(_)) => {
                tracing::warn!(provider, "language model returned an empty answer");
                (offline_reply(request), OFFLINE_PROVIDER.into())
            }
            Ok(Err(e)) => {
                tracing::warn!(provider, error = %e, "language model call failed");
                (offline_reply(request), OFFLINE_PROVIDER.into())
            }
            Err(_) => {
                tracing::warn!(
                    provider,
                    timeout_secs = self.timeout.as_secs(),
                    "language model call timed out"
                );
                (offline_reply(request), OFFLINE_PROVIDER.into())
            }
        }
    }
}

#[async_trait]
impl Handler for GeneralLlmHandler {
    async fn run(
        &self,
        request: &str,
        context: Option<&FallbackContext>,
    ) -> HandlerResult<HandlerOutput> {
        let now = Utc::now();
        let system = system_prompt(context, now);
        let (response, provider) = self.answer(request, &system).await;

        tracing::debug!(
            provider = %provider,
            context_used = context.is_some(),
            "general question answered"
        );

        let mut output = HandlerOutput::text(response);
        output.service = Some(SERVICE_NAME.into());
        output.extra.insert("question".into(), json!(request));
        output.extra.insert("provider".into(), json!(provider));
        output
            .extra
            .insert("context_used".into(), json!(context.is_some()));
        output.extra.insert("timestamp".into(), json!(now.to_rfc3339()));
        Ok(output)
    }

    fn backend_name(&self) -> &str {
        self.model
            .as_deref()
            .map_or(OFFLINE_PROVIDER, |m| m.provider_name())
    }
}

/// System instructions for the model; escalation context is embedded as JSON.
pub fn system_prompt(context: Option<&FallbackContext>, now: DateTime<Utc>) -> String {
    let mut prompt = format!(
        "You are the general-purpose assistant of a cloud infrastructure request router. \
You answer whatever the specialized handlers (AWS resource queries, network troubleshooting) \
could not: general AWS questions, architecture and security practice, cost optimization, \
troubleshooting guidance, DevOps and scripting help, and any other technical question.\n\n\
Be accurate and practical. When unsure, say so and point to an authoritative source.\n\n\
Current time: {}",
        now.format("%Y-%m-%d %H:%M:%S UTC")
    );

    if let Some(ctx) = context {
        let ctx_json = serde_json::to_string_pretty(ctx).unwrap_or_else(|_| "{}".into());
        prompt.push_str(&format!(
            "\n\nA specialized handler already tried this request. Context:\n{ctx_json}"
        ));
    }

    prompt
}

/// Deterministic guidance used when no language model can answer.
pub fn offline_reply(request: &str) -> String {
    format!(
        "You asked: \"{request}\"\n\n\
No language model backend is reachable right now, so here is general guidance instead.\n\n\
AWS questions:\n\
- `aws <service> help` documents every CLI command\n\
- The AWS Well-Architected Framework covers design and cost trade-offs\n\
- CloudTrail and CloudWatch logs are the first stop for troubleshooting\n\n\
To enable full answers, set `provider = \"bedrock\"` or `provider = \"ollama\"` in the [llm] \
section of the router configuration.\n\n\
Resource listings and network diagnostics are still served by the specialized handlers; \
type `help` to see them."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_protocol::ValidationResult;

    /// Model stub with a fixed answer, failure, or delay.
    enum StubModel {
        Answer(&'static str),
        Blank,
        Fail,
        Slow,
    }

    #[async_trait]
    impl LanguageModel for StubModel {
        async fn complete(&self, _system: &str, prompt: &str) -> anyhow::Result<String> {
            match self {
                Self::Answer(a) => Ok(format!("{a}: {prompt}")),
                Self::Blank => Ok("  \n".into()),
                Self::Fail => anyhow::bail!("connection refused"),
                Self::Slow => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok("late".into())
                }
            }
        }

        fn provider_name(&self) -> &str {
            "stub"
        }
    }

    fn handler(model: StubModel) -> GeneralLlmHandler {
        GeneralLlmHandler::new(Some(Box::new(model)), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn answers_with_model() {
        let output = handler(StubModel::Answer("42"))
            .run("meaning of life", None)
            .await
            .unwrap();
        assert_eq!(output.response.as_deref(), Some("42: meaning of life"));
        assert_eq!(output.service.as_deref(), Some("general_llm"));
        assert_eq!(output.extra["provider"], "stub");
        assert_eq!(output.extra["question"], "meaning of life");
        assert_eq!(output.extra["context_used"], false);
        assert!(!output.has_error());
    }

    #[tokio::test]
    async fn model_failure_degrades_to_offline() {
        let output = handler(StubModel::Fail).run("list buckets", None).await.unwrap();
        assert_eq!(output.extra["provider"], "offline");
        assert!(output.response.unwrap().contains("list buckets"));
    }

    #[tokio::test(start_paused = true)]
    async fn model_timeout_degrades_to_offline() {
        let output = handler(StubModel::Slow).run("anything", None).await.unwrap();
        assert_eq!(output.extra["provider"], "offline");
    }

    #[tokio::test]
    async fn empty_answer_degrades_to_offline() {
        let output = handler(StubModel::Blank).run("anything", None).await.unwrap();
        assert_eq!(output.extra["provider"], "offline");
        assert!(output.response.unwrap().contains("anything"));
    }

    #[tokio::test]
    async fn offline_handler_never_fails() {
        let h = GeneralLlmHandler::offline();
        assert_eq!(h.backend_name(), "offline");
        let output = h.run("what is a vpc", None).await.unwrap();
        assert!(!output.is_blank());
        assert_eq!(output.extra["provider"], "offline");
    }

    #[tokio::test]
    async fn records_context_use() {
        let ctx = FallbackContext::irrelevant(
            "network_troubleshoot_tool",
            ValidationResult::irrelevant(0.3, "No diagnostics or recommendations provided"),
            HandlerOutput::default(),
        );
        let output = handler(StubModel::Answer("ok"))
            .run("ping my host", Some(&ctx))
            .await
            .unwrap();
        assert_eq!(output.extra["context_used"], true);
    }

    #[test]
    fn prompt_embeds_context_json() {
        let ctx = FallbackContext::agent_error("aws_resource_tool", "AccessDenied", None);
        let prompt = system_prompt(Some(&ctx), Utc::now());
        assert!(prompt.contains("\"failed_handler_id\": \"aws_resource_tool\""));
        assert!(prompt.contains("\"reason\": \"agent_error\""));

        let bare = system_prompt(None, Utc::now());
        assert!(!bare.contains("Context:"));
    }
}
