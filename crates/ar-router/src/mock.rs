//! Mock handler for testing without real capability backends.
//!
//! Serves queued results in order and records every call for assertion
//! in tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use ar_protocol::HandlerOutput;

use crate::error::HandlerResult;
use crate::handler::{FallbackContext, Handler};

/// A recorded `run` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: String,
    pub context: Option<FallbackContext>,
}

/// Mock implementation of the `Handler` trait.
///
/// Queued results are served first-in first-out; once the queue is empty
/// every call returns the default output. Thread-safe via `Mutex`
/// (fine for test contexts).
pub struct MockHandler {
    queued: Mutex<VecDeque<HandlerResult<HandlerOutput>>>,
    default_output: HandlerOutput,
    calls: Mutex<Vec<RecordedCall>>,
    delay: Option<Duration>,
}

impl MockHandler {
    pub fn new() -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            default_output: HandlerOutput::text("mock response"),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Mock that answers every call with `output`.
    pub fn answering(output: HandlerOutput) -> Self {
        Self {
            default_output: output,
            ..Self::new()
        }
    }

    /// Sleep before answering (for timeout tests).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful result.
    pub fn push_ok(&self, output: HandlerOutput) {
        self.queued.lock().unwrap().push_back(Ok(output));
    }

    /// Queue a raised error.
    pub fn push_err(&self, error: crate::error::HandlerError) {
        self.queued.lock().unwrap().push_back(Err(error));
    }

    /// Get all recorded calls.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of times the handler was invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Get the last recorded call.
    pub fn last_call(&self) -> Option<RecordedCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl Default for MockHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for MockHandler {
    async fn run(
        &self,
        request: &str,
        context: Option<&FallbackContext>,
    ) -> HandlerResult<HandlerOutput> {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.to_string(),
            context: context.cloned(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let queued = self.queued.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(self.default_output.clone()))
    }

    fn backend_name(&self) -> &str {
        "mock"
    }
}
