//! Agent Router: routes free-text requests to capability handlers.
//!
//! Reads one request per line on stdin and writes a JSON reply per request
//! on stdout. Logs go to stderr as JSON.

use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use ar_console::{App, AppConfig, console};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "agent-router starting"
    );

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args().nth(1);
    let config = AppConfig::load(config_path.as_deref())?;
    tracing::info!(
        handler_count = config.handlers.len(),
        llm_provider = ?config.llm.provider,
        learning_enabled = config.routing.learning_enabled,
        "config loaded"
    );

    // ── Registry, store, router ─────────────────────────────────
    let app = App::build(&config).await?;
    tracing::info!(
        handlers = ?app.router.registry().ids(),
        "capability registry initialized"
    );

    let flusher = app.spawn_flusher();

    // ── Request loop ────────────────────────────────────────────
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();

    tokio::select! {
        result = console::run(&app.router, stdin, stdout) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "console loop failed");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    flusher.abort();
    app.shutdown().await;
    tracing::info!("agent-router stopped");
    Ok(())
}
