//! Routing, handler, and store error types.

use thiserror::Error;

/// Failure of a single handler invocation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HandlerError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("invalid handler output: {0}")]
    InvalidOutput(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias for handler results.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Failures of the learning store's durable storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("history encoding error: {0}")]
    Encoding(String),
}

/// Convenience alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the router.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("could not determine the intent of the request and fallback is disabled")]
    SelectionAmbiguous,

    #[error("handler {handler_id} failed: {message}")]
    HandlerFault { handler_id: String, message: String },

    #[error("handler {handler_id} response rejected: {}", reasons.join("; "))]
    ValidationRejected {
        handler_id: String,
        reasons: Vec<String>,
    },

    #[error("all handlers failed (original: {original}; fallback: {fallback})")]
    FallbackFault { original: String, fallback: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("unknown handler: {0}")]
    UnknownHandler(String),

    #[error("invalid registry: {0}")]
    Registry(String),
}

/// Convenience alias for router results.
pub type RouterResult<T> = Result<T, RouterError>;
