//! Concrete capability handlers for the agent router.
//!
//! - [`HttpHandler`]: forwards requests to a specialized service over HTTP.
//! - [`GeneralLlmHandler`]: the general-purpose fallback, answering with a
//!   language model (Bedrock or Ollama) or a deterministic offline reply.

pub mod http;
pub mod llm;

pub use http::{HttpHandler, HttpHandlerConfig};
pub use llm::{GeneralLlmHandler, LanguageModel, LlmConfig, LlmProvider};
