//! Shared test harness for E2E integration tests.
//!
//! Wires the real binary configuration (`ar_console::App`) against wiremock
//! servers standing in for the AWS resource service, the network
//! troubleshooting service, and optionally an Ollama server. Routing
//! history goes to a temp directory so restarts can be exercised.

#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use ar_console::{App, AppConfig};
use ar_handlers::LlmProvider;
use ar_handlers::llm::ollama::OllamaConfig;
use ar_protocol::RoutedResponse;

pub const RESOURCE_PATH: &str = "/aws-resources";
pub const NETWORK_PATH: &str = "/network";

/// End-to-end harness: built-in registry, HTTP-backed specialized handlers.
pub struct TestHarness {
    pub app: App,
    pub config: AppConfig,
    /// Backs `aws_resource_tool`.
    pub resource_server: MockServer,
    /// Backs `network_troubleshoot_tool`.
    pub network_server: MockServer,
    /// Backs the general handler when started with `with_ollama`.
    pub ollama_server: Option<MockServer>,
    pub history_path: PathBuf,
    _history_dir: TempDir,
}

impl TestHarness {
    /// Built-in configuration, offline general handler.
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Built-in configuration, general handler backed by a mock Ollama server.
    pub async fn with_ollama() -> Self {
        Self::build(true, |_| {}).await
    }

    /// Built-in configuration adjusted by `customize` before the app is built.
    pub async fn start_with(customize: impl FnOnce(&mut AppConfig)) -> Self {
        Self::build(false, customize).await
    }

    async fn build(ollama: bool, customize: impl FnOnce(&mut AppConfig)) -> Self {
        let resource_server = MockServer::start().await;
        let network_server = MockServer::start().await;
        let ollama_server = if ollama {
            Some(MockServer::start().await)
        } else {
            None
        };

        let history_dir = tempfile::tempdir().unwrap();
        let history_path = history_dir.path().join("routing_history.json");

        let mut config = AppConfig::default();
        config.store.path = Some(history_path.clone());
        for spec in &mut config.handlers {
            match spec.id.as_str() {
                "aws_resource_tool" => {
                    spec.endpoint = Some(format!("{}{RESOURCE_PATH}", resource_server.uri()));
                }
                "network_troubleshoot_tool" => {
                    spec.endpoint = Some(format!("{}{NETWORK_PATH}", network_server.uri()));
                }
                _ => {}
            }
        }
        if let Some(server) = &ollama_server {
            config.llm.provider = LlmProvider::Ollama;
            config.llm.timeout_secs = 5;
            config.llm.ollama = OllamaConfig {
                host: server.uri(),
                model: "llama3.2".into(),
                timeout_secs: 5,
            };
        }
        customize(&mut config);

        let app = App::build(&config).await.unwrap();

        Self {
            app,
            config,
            resource_server,
            network_server,
            ollama_server,
            history_path,
            _history_dir: history_dir,
        }
    }

    /// One routing cycle.
    pub async fn route(&self, text: &str) -> RoutedResponse {
        self.app.router.route(text).await
    }

    /// One request-channel line (commands included), as JSON.
    pub async fn reply(&self, text: &str) -> Value {
        serde_json::to_value(self.app.router.handle(text).await).unwrap()
    }

    /// Flush, then build a fresh app from the same configuration, as a
    /// process restart would.
    pub async fn restart(&self) -> App {
        self.app.shutdown().await;
        App::build(&self.config).await.unwrap()
    }

    /// The history file as written to disk.
    pub fn history_on_disk(&self) -> Value {
        let raw = std::fs::read_to_string(&self.history_path).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    pub fn ollama(&self) -> &MockServer {
        self.ollama_server.as_ref().unwrap()
    }
}

/// Resource service answering every request with `body`.
pub async fn mount_resource(h: &TestHarness, body: Value) {
    mount_json(&h.resource_server, RESOURCE_PATH, body).await;
}

/// Network service answering every request with `body`.
pub async fn mount_network(h: &TestHarness, body: Value) {
    mount_json(&h.network_server, NETWORK_PATH, body).await;
}

pub async fn mount_json(server: &MockServer, route: &str, body: Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Ollama answering every chat with `content`.
pub async fn mount_ollama(h: &TestHarness, content: &str) {
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "message": {"role": "assistant", "content": content},
            "done": true
        })))
        .mount(h.ollama())
        .await;
}

/// A typical resource listing.
pub fn vpc_listing(count: u64) -> Value {
    let resources: Vec<Value> = (1..=count)
        .map(|i| json!({"VpcId": format!("vpc-{i:04}"), "State": "available"}))
        .collect();
    json!({
        "service": "vpc",
        "count": count,
        "resources": resources,
        "region": "us-east-1"
    })
}

/// A typical diagnostics report.
pub fn connectivity_report() -> Value {
    json!({
        "diagnostics": {
            "security_groups": "port 22 closed to 0.0.0.0/0",
            "route_table": "ok"
        },
        "recommendations": ["Open port 22 to your address in sg-0abc"]
    })
}

/// Requests received by `server`, decoded as JSON bodies.
pub async fn received_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}
