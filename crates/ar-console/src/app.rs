//! Wiring: configuration in, a ready [`Router`] out.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use ar_handlers::{HttpHandler, HttpHandlerConfig, LlmConfig};
use ar_router::{
    CapabilityRegistry, FeedbackStore, Handler, RegisteredHandler, Router, RoutingConfig,
    StoreConfig,
};

use crate::config::{AppConfig, HandlerKind, HandlerSpec};

pub struct App {
    pub router: Arc<Router>,
    pub store: Arc<FeedbackStore>,
}

impl App {
    /// Build every configured handler, load history, and assemble the router.
    pub async fn build(config: &AppConfig) -> anyhow::Result<Self> {
        let mut entries = Vec::with_capacity(config.handlers.len());
        for spec in &config.handlers {
            let handler = build_handler(spec, &config.llm).await?;
            info!(
                handler_id = %spec.id,
                backend = handler.backend_name(),
                is_fallback = spec.is_fallback,
                "handler registered"
            );
            entries.push(RegisteredHandler::new(spec.descriptor(), handler));
        }
        let registry = CapabilityRegistry::new(entries)?;
        Ok(Self::assemble(registry, config.routing.clone(), config.store.clone()).await)
    }

    /// Assemble around an already-built registry.
    ///
    /// History that cannot be loaded is logged and skipped; the router starts
    /// with an empty store and keeps serving.
    pub async fn assemble(
        registry: CapabilityRegistry,
        routing: RoutingConfig,
        store_config: StoreConfig,
    ) -> Self {
        let store = Arc::new(FeedbackStore::new(store_config));
        match store.load_on_startup().await {
            Ok(loaded) => info!(entries = loaded, "routing history loaded"),
            Err(e) => warn!(error = %e, "routing history unavailable, starting empty"),
        }

        let router = Arc::new(Router::new(Arc::new(registry), store.clone(), routing));
        Self { router, store }
    }

    /// Start the background history flusher.
    pub fn spawn_flusher(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let interval = store.config().flush_interval();
        tokio::spawn(async move { store.run_flusher(interval).await })
    }

    /// Final flush before exit.
    pub async fn shutdown(&self) {
        match self.store.flush().await {
            Ok(()) => info!("routing history flushed"),
            Err(e) => warn!(error = %e, "final history flush failed"),
        }
    }
}

async fn build_handler(spec: &HandlerSpec, llm: &LlmConfig) -> anyhow::Result<Arc<dyn Handler>> {
    match spec.kind {
        HandlerKind::Http => {
            let endpoint = spec.endpoint.clone().ok_or_else(|| {
                anyhow::anyhow!("handler {} is kind = \"http\" but has no endpoint", spec.id)
            })?;
            let handler = HttpHandler::new(&HttpHandlerConfig {
                endpoint,
                timeout_secs: spec.timeout_secs,
            })?;
            Ok(Arc::new(handler))
        }
        HandlerKind::Llm => Ok(Arc::new(llm.build_handler().await?)),
    }
}
