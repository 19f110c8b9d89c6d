//! `[llm]` configuration and backend construction.

use std::time::Duration;

use serde::Deserialize;

use super::bedrock::{BedrockConfig, BedrockModel};
use super::ollama::{OllamaConfig, OllamaModel};
use super::{GeneralLlmHandler, LanguageModel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Bedrock,
    Ollama,
    #[default]
    Offline,
}

impl std::str::FromStr for LlmProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bedrock" => Ok(Self::Bedrock),
            "ollama" => Ok(Self::Ollama),
            "offline" => Ok(Self::Offline),
            other => Err(format!("unknown llm provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Overall answer deadline; past it the handler replies offline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub bedrock: BedrockConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_timeout_secs() -> u64 {
    25
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            timeout_secs: default_timeout_secs(),
            bedrock: BedrockConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

impl LlmConfig {
    /// Apply environment overrides (`LLM_PROVIDER`, `BEDROCK_MODEL_ID`,
    /// `BEDROCK_TIMEOUT_SECS`, `OLLAMA_HOST`, `OLLAMA_MODEL`).
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(provider) = lookup("LLM_PROVIDER") {
            match provider.parse() {
                Ok(p) => self.provider = p,
                Err(e) => tracing::warn!(error = %e, "ignoring LLM_PROVIDER"),
            }
        }
        self.bedrock = self.bedrock.with_overrides(&lookup);
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.ollama.host = host;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the configured model backend. `Offline` has none.
    pub async fn build_model(&self) -> anyhow::Result<Option<Box<dyn LanguageModel>>> {
        let model: Option<Box<dyn LanguageModel>> = match self.provider {
            LlmProvider::Bedrock => {
                tracing::info!(model_id = %self.bedrock.model_id, "bedrock backend enabled");
                Some(Box::new(
                    BedrockModel::from_default_chain(self.bedrock.clone()).await,
                ))
            }
            LlmProvider::Ollama => {
                tracing::info!(
                    host = %self.ollama.host,
                    model = %self.ollama.model,
                    "ollama backend enabled"
                );
                Some(Box::new(OllamaModel::new(self.ollama.clone())?))
            }
            LlmProvider::Offline => {
                tracing::info!("no language model configured, general handler runs offline");
                None
            }
        };
        Ok(model)
    }

    /// The general-purpose handler for this configuration.
    pub async fn build_handler(&self) -> anyhow::Result<GeneralLlmHandler> {
        Ok(GeneralLlmHandler::new(self.build_model().await?, self.timeout()))
    }
}
