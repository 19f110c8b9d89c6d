//! Router configuration, loadable from TOML.
//!
//! Every section is optional. Without `[[handlers]]` the built-in registry
//! is used: the AWS resource and network troubleshooting services (HTTP)
//! plus the general LLM fallback.

use std::path::Path;

use serde::Deserialize;

use ar_handlers::LlmConfig;
use ar_protocol::{HandlerDescriptor, HandlerFamily};
use ar_router::{RoutingConfig, StoreConfig};

/// Used when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/agent-router/router.toml";

/// Top-level configuration for the router binary.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub store: StoreConfig,
    /// Handler registry, in declaration (tie-break) order.
    #[serde(default = "default_handlers")]
    pub handlers: Vec<HandlerSpec>,
    #[serde(default)]
    pub llm: LlmConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            store: StoreConfig::default(),
            handlers: default_handlers(),
            llm: LlmConfig::default(),
        }
    }
}

/// How a handler is backed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// POST to `endpoint`.
    #[default]
    Http,
    /// The general-purpose LLM handler configured under `[llm]`.
    Llm,
}

/// One `[[handlers]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlerSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub family: HandlerFamily,
    #[serde(default)]
    pub trigger_terms: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub is_fallback: bool,
    #[serde(default)]
    pub kind: HandlerKind,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_handler_timeout")]
    pub timeout_secs: u64,
}

fn default_handler_timeout() -> u64 {
    20
}

impl HandlerSpec {
    pub fn descriptor(&self) -> HandlerDescriptor {
        let base = if self.is_fallback {
            let mut d = HandlerDescriptor::fallback(&self.id, &self.description);
            d.family = self.family;
            d.trigger_terms = self.trigger_terms.clone();
            d
        } else {
            HandlerDescriptor::specialized(
                &self.id,
                &self.description,
                self.family,
                self.trigger_terms.iter().cloned(),
            )
        };
        base.with_examples(self.examples.iter().cloned())
    }
}

impl AppConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] when it exists, or
    /// fall back to the built-in configuration. LLM environment overrides
    /// are applied last.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(DEFAULT_CONFIG_PATH)?
            }
            None => {
                tracing::info!("no config file, using built-in configuration");
                Self::default()
            }
        };
        config.llm = config.llm.with_env_overrides();
        Ok(config)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Built-in registry.
pub fn default_handlers() -> Vec<HandlerSpec> {
    vec![
        HandlerSpec {
            id: "aws_resource_tool".into(),
            description: "Retrieves AWS resource information and attributes".into(),
            family: HandlerFamily::ResourceQuery,
            trigger_terms: strings(&[
                "ec2", "s3", "ebs", "vpc", "nlb", "alb", "elb", "eks", "cloudwatch",
                "cloudtrail", "efs", "security", "group", "instance", "bucket", "load",
                "balancer", "filesystem", "resource", "list", "show", "get", "describe", "info",
                "breakdown", "count", "each", "type", "state", "summary", "how many", "total",
                "running", "stopped", "micro", "small", "subnet", "lambda", "function", "rds",
                "database", "volume", "snapshot", "gateway", "route", "services", "aws",
            ]),
            examples: strings(&[
                "Show me all EC2 instances",
                "List S3 buckets",
                "Get load balancer information",
                "Display EFS filesystems",
                "Show security group details",
                "What EC2 instances are running?",
                "Get information about my VPC resources",
            ]),
            is_fallback: false,
            kind: HandlerKind::Http,
            endpoint: Some("http://127.0.0.1:8081/aws-resources".into()),
            timeout_secs: default_handler_timeout(),
        },
        HandlerSpec {
            id: "network_troubleshoot_tool".into(),
            description: "Diagnoses and provides solutions for network connectivity issues"
                .into(),
            family: HandlerFamily::Diagnostics,
            trigger_terms: strings(&[
                "connectivity", "connection", "network", "troubleshoot", "diagnose", "ping",
                "port", "dns", "resolve", "trace", "issue", "problem", "error", "fail",
                "timeout", "unreachable", "mount", "access", "communication", "ssh", "http",
                "https",
            ]),
            examples: strings(&[
                "Diagnose EC2 connectivity issues",
                "Troubleshoot load balancer connection problems",
                "Check EFS mount connectivity",
                "Diagnose S3 access issues",
                "Why can't I connect to my EC2 instance?",
                "Load balancer is not responding",
                "EFS mount is failing",
            ]),
            is_fallback: false,
            kind: HandlerKind::Http,
            endpoint: Some("http://127.0.0.1:8082/network".into()),
            timeout_secs: default_handler_timeout(),
        },
        HandlerSpec {
            id: "general_llm_tool".into(),
            description: "Handles any question using advanced language model capabilities"
                .into(),
            family: HandlerFamily::General,
            trigger_terms: Vec::new(),
            examples: Vec::new(),
            is_fallback: true,
            kind: HandlerKind::Llm,
            endpoint: None,
            timeout_secs: default_handler_timeout(),
        },
    ]
}
