//! HTTP pass-through handler.
//!
//! POSTs `{"request": ..., "context": ...}` to a specialized service and
//! returns its body as the structured result. JSON objects are parsed into
//! `HandlerOutput`; any other body is kept as `raw_output`.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use ar_protocol::HandlerOutput;
use ar_router::{FallbackContext, Handler, HandlerError, HandlerResult};

/// Endpoint settings for one HTTP-backed handler.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpHandlerConfig {
    pub endpoint: String,
    /// Client-side request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    20
}

#[derive(Serialize)]
struct HandlerRequest<'a> {
    request: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a FallbackContext>,
}

pub struct HttpHandler {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpHandler {
    pub fn new(config: &HttpHandlerConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build http client: {e}"))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Handler for HttpHandler {
    async fn run(
        &self,
        request: &str,
        context: Option<&FallbackContext>,
    ) -> HandlerResult<HandlerOutput> {
        let body = HandlerRequest { request, context };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HandlerError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    HandlerError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| HandlerError::Request(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            tracing::warn!(
                endpoint = %self.endpoint,
                status = %status,
                "handler endpoint returned non-2xx"
            );
            return Err(HandlerError::Request(format!(
                "{} returned {status}: {}",
                self.endpoint,
                text.trim()
            )));
        }

        Ok(HandlerOutput::from_text(&text))
    }

    fn backend_name(&self) -> &str {
        "http"
    }
}
