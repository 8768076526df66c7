//! Agent configuration

use agent_lib::{ConfigurationError, PluginConfig};
use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

/// Agent configuration, read from `AGENT_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Node name from Kubernetes downward API
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Port serving anomalies, health and metrics
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Base address of the metrics API
    #[serde(default = "default_source_address")]
    pub source_address: String,

    /// Bearer token for the metrics API
    #[serde(default)]
    pub source_token: Option<String>,

    /// PEM CA certificate for the metrics API, needed for the kubelet's
    /// self-signed serving certificate
    #[serde(default)]
    pub source_ca_path: Option<String>,

    /// Enable the anomaly plugin
    #[serde(default = "default_enable")]
    pub enable: bool,

    /// Snapshot polling interval in seconds (0 disables polling)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Percentile threshold for anomaly filtering (0 or less disables filtering)
    #[serde(default = "default_threshold_percentile")]
    pub threshold_percentile: i64,

    /// Anomaly scorer address
    #[serde(default = "default_model_address")]
    pub model_address: String,

    /// Timeout for each call to the metrics API or scorer, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_listen_port() -> u16 {
    8002
}

fn default_source_address() -> String {
    "https://127.0.0.1:10250".to_string()
}

fn default_enable() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    10
}

fn default_threshold_percentile() -> i64 {
    99
}

fn default_model_address() -> String {
    "http://127.0.0.1:5001".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            node_name: default_node_name(),
            listen_port: default_listen_port(),
            source_address: default_source_address(),
            source_token: None,
            source_ca_path: None,
            enable: default_enable(),
            poll_interval_secs: default_poll_interval(),
            threshold_percentile: default_threshold_percentile(),
            model_address: default_model_address(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from the environment and validate it
    pub fn load() -> Result<Self> {
        let config: AgentConfig = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT"))
            .build()?
            .try_deserialize()?;

        config.plugin_config().validate()?;
        Ok(config)
    }

    /// Settings for the anomaly plugin
    pub fn plugin_config(&self) -> PluginConfig {
        PluginConfig {
            enable: self.enable,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            threshold_percentile: self.threshold_percentile,
            model_address: self.model_address.clone(),
            source_address: self.source_address.clone(),
            source_token: self.source_token.clone().filter(|t| !t.is_empty()),
            source_ca_path: self.source_ca_path.clone().filter(|p| !p.is_empty()),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.plugin_config().validate()
    }
}
