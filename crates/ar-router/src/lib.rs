//! Request routing and learning engine.
//!
//! Scores free-text requests against a registry of capability handlers,
//! invokes the best match, validates its answer, escalates to the
//! general-purpose fallback handler when the specialized attempt fails,
//! and records every decision in a bounded, persisted learning log.

pub mod classifier;
pub mod commands;
pub mod config;
pub mod error;
pub mod fallback;
pub mod handler;
pub mod mock;
pub mod registry;
pub mod router;
pub mod store;
pub mod validator;

// Re-export key types for convenience
pub use commands::{Command, parse_command};
pub use config::{RoutingConfig, StoreConfig};
pub use error::{HandlerError, HandlerResult, RouterError, RouterResult, StoreError, StoreResult};
pub use fallback::{FallbackAdapter, FallbackResponse};
pub use handler::{FallbackContext, Handler};
pub use mock::MockHandler;
pub use registry::{CapabilityRegistry, RegisteredHandler};
pub use router::Router;
pub use store::{FeedbackStore, jaccard_similarity};
pub use validator::ResponseValidator;
