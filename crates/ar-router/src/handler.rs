//! Capability handler interface.
//!
//! Every handler (specialized or fallback) is resolved once at startup into
//! a `dyn Handler` trait object held by the registry.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::timeout;

use ar_protocol::{FallbackReason, HandlerOutput, ValidationResult};

use crate::error::{HandlerError, HandlerResult};

/// Context handed to the fallback handler after a specialized attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FallbackContext {
    pub reason: FallbackReason,
    pub failed_handler_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_failure: Option<ValidationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_result: Option<HandlerOutput>,
}

impl FallbackContext {
    /// Context for a specialized handler that raised or returned an error.
    pub fn agent_error(
        failed_handler_id: impl Into<String>,
        error: impl Into<String>,
        original_result: Option<HandlerOutput>,
    ) -> Self {
        Self {
            reason: FallbackReason::AgentError,
            failed_handler_id: failed_handler_id.into(),
            error: Some(error.into()),
            validation_failure: None,
            original_result,
        }
    }

    /// Context for a specialized answer the validator rejected.
    pub fn irrelevant(
        failed_handler_id: impl Into<String>,
        validation: ValidationResult,
        original_result: HandlerOutput,
    ) -> Self {
        Self {
            reason: FallbackReason::IrrelevantResponse,
            failed_handler_id: failed_handler_id.into(),
            error: None,
            validation_failure: Some(validation),
            original_result: Some(original_result),
        }
    }
}

/// A capability provider that can attempt to answer a request.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Answer a raw request. `context` is only set when the router
    /// escalates to the fallback handler.
    async fn run(
        &self,
        request: &str,
        context: Option<&FallbackContext>,
    ) -> HandlerResult<HandlerOutput>;

    /// Backend name (for logging/audit).
    fn backend_name(&self) -> &str;
}

/// Run a handler with a deadline. Elapsed deadlines drop the in-flight
/// call and surface as `HandlerError::Timeout`.
pub async fn invoke(
    handler: &dyn Handler,
    request: &str,
    context: Option<&FallbackContext>,
    limit: Duration,
) -> HandlerResult<HandlerOutput> {
    match timeout(limit, handler.run(request, context)).await {
        Ok(result) => result,
        Err(_) => Err(HandlerError::Timeout {
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}
