//! Fallback handler adapter.
//!
//! Wraps the registry's general-purpose handler: hands it the optional
//! escalation context, bounds it with the handler deadline, and tags what
//! it returns with `is_fallback` and the triggering reason.

use std::sync::Arc;
use std::time::Duration;

use ar_protocol::{FallbackReason, HandlerOutput};

use crate::error::{HandlerError, HandlerResult};
use crate::handler::{self, FallbackContext, Handler};
use crate::registry::CapabilityRegistry;

/// Substituted when the fallback handler answers with nothing readable.
pub const EMPTY_RESPONSE_MESSAGE: &str =
    "The request was received, but no handler produced an answer. Please rephrase or add more detail.";

/// An answer produced by the fallback handler.
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackResponse {
    pub handler_id: String,
    pub output: HandlerOutput,
    /// Always true; carried so callers never need to infer it.
    pub is_fallback: bool,
    pub reason: FallbackReason,
    pub context_provided: bool,
}

pub struct FallbackAdapter {
    handler_id: String,
    handler: Arc<dyn Handler>,
    timeout: Duration,
}

impl FallbackAdapter {
    pub fn new(registry: &CapabilityRegistry, timeout: Duration) -> Self {
        let fallback = registry.fallback();
        Self {
            handler_id: fallback.id().to_string(),
            handler: fallback.handler.clone(),
            timeout,
        }
    }

    pub fn handler_id(&self) -> &str {
        &self.handler_id
    }

    /// Invoke the fallback handler once.
    ///
    /// An output that carries an error marker and no answer counts as a
    /// failure of the adapter, the same as a raised error or a timeout.
    pub async fn invoke(
        &self,
        request: &str,
        context: Option<&FallbackContext>,
        reason: FallbackReason,
    ) -> HandlerResult<FallbackResponse> {
        tracing::debug!(
            handler_id = %self.handler_id,
            reason = %reason,
            context_provided = context.is_some(),
            "invoking fallback handler"
        );

        let mut output =
            handler::invoke(self.handler.as_ref(), request, context, self.timeout).await?;

        if output.has_error() && output.response.is_none() {
            return Err(HandlerError::InvalidOutput(output.error_message()));
        }
        if output.is_blank() {
            output.response = Some(EMPTY_RESPONSE_MESSAGE.to_string());
        }

        Ok(FallbackResponse {
            handler_id: self.handler_id.clone(),
            output,
            is_fallback: true,
            reason,
            context_provided: context.is_some(),
        })
    }
}
