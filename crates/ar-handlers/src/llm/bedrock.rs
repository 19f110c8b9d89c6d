//! AWS Bedrock backend via the model-agnostic Converse API.
//!
//! Works with any Converse-capable model (Nova, Claude, Llama, ...).

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, InferenceConfiguration, Message,
    SystemContentBlock,
};
use serde::Deserialize;

use super::LanguageModel;

/// Configuration for the Bedrock backend.
#[derive(Debug, Clone, Deserialize)]
pub struct BedrockConfig {
    /// Bedrock model ID (e.g., "us.amazon.nova-lite-v1:0").
    #[serde(default = "default_model_id")]
    pub model_id: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: i32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_model_id() -> String {
    "us.amazon.nova-lite-v1:0".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_tokens() -> i32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}

impl Default for BedrockConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            timeout_secs: default_timeout_secs(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

impl BedrockConfig {
    /// Defaults with `BEDROCK_MODEL_ID` / `BEDROCK_TIMEOUT_SECS` applied.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `BEDROCK_MODEL_ID` and `BEDROCK_TIMEOUT_SECS` from `lookup`.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(model_id) = lookup("BEDROCK_MODEL_ID") {
            self.model_id = model_id;
        }
        if let Some(secs) = lookup("BEDROCK_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.timeout_secs = secs;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub struct BedrockModel {
    client: BedrockClient,
    config: BedrockConfig,
}

impl BedrockModel {
    /// Create a backend with a pre-built Bedrock client.
    pub fn new(client: BedrockClient, config: BedrockConfig) -> Self {
        Self { client, config }
    }

    /// Build a client from the default AWS credential and region chain.
    pub async fn from_default_chain(config: BedrockConfig) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(BedrockClient::new(&sdk_config), config)
    }
}

#[async_trait]
impl LanguageModel for BedrockModel {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let user_message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(prompt.to_string()))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build message: {e}"))?;

        let inference = InferenceConfiguration::builder()
            .max_tokens(self.config.max_tokens)
            .temperature(self.config.temperature)
            .build();

        let response = self
            .client
            .converse()
            .model_id(&self.config.model_id)
            .system(SystemContentBlock::Text(system.to_string()))
            .messages(user_message)
            .inference_config(inference)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("bedrock converse error: {e}"))?;

        let output = response
            .output()
            .ok_or_else(|| anyhow::anyhow!("no output in bedrock response"))?;

        let ConverseOutput::Message(msg) = output else {
            anyhow::bail!("unexpected bedrock output variant");
        };

        let text: Vec<&str> = msg
            .content()
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();

        if text.is_empty() {
            anyhow::bail!("no text content in bedrock response");
        }
        Ok(text.join("\n"))
    }

    fn provider_name(&self) -> &str {
        "bedrock"
    }
}
