//! Ollama chat backend.
//!
//! Calls the Ollama HTTP API (`/api/chat`, non-streaming) with a system
//! and a user message and returns the assistant's reply text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::LanguageModel;

/// Connection settings for an Ollama server.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaConfig {
    /// Ollama HTTP API base URL.
    #[serde(default = "default_host")]
    pub host: String,
    /// Model to use for inference.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "llama3.2".into()
}
fn default_timeout_secs() -> u64 {
    60
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Ollama chat API request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Ollama chat API response (only fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

pub struct OllamaModel {
    client: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaModel {
    pub fn new(config: OllamaConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build ollama client: {e}"))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LanguageModel for OllamaModel {
    async fn complete(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("ollama request failed: {e}"))?;

        if !response.status().is_success() {
            anyhow::bail!("ollama returned {}", response.status());
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("failed to parse ollama response body: {e}"))?;

        chat.message
            .map(|m| m.content)
            .ok_or_else(|| anyhow::anyhow!("no message in ollama response"))
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }
}
