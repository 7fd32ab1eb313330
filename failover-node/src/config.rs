use crate::connection::ConnectionManager;
use crate::error::{NodeError, NodeResult};
use crate::node::{Credentials, NodeIdentity};
use crate::transport::Transport;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Retry policy for administrative commands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per command, counting the first one
    pub max_attempts: u32,

    /// Pause after a broken connection before reconnecting (ms)
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3, // a restarting node usually answers within three reconnects
            backoff_ms: 0,   // reconnect immediately
        }
    }
}

impl RetryConfig {
    /// Set the maximum attempts per command
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the pause between attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    /// Attempts actually made; a command always runs at least once
    pub fn effective_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// One node as it appears in the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// `host:port` of the node
    pub address: String,

    /// Administrative account
    pub admin_user: Credentials,

    /// Account replicas use to pull from this node
    pub replication_user: Credentials,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl NodeConfig {
    pub fn identity(&self) -> NodeIdentity {
        NodeIdentity::new(
            self.address.clone(),
            self.admin_user.clone(),
            self.replication_user.clone(),
        )
    }

    /// Build a connection manager for this node over `transport`
    pub fn connection_manager<T: Transport>(&self, transport: T) -> ConnectionManager<T> {
        ConnectionManager::with_retry(self.identity(), transport, self.retry.clone())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,

    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

/// Top-level configuration: the nodes an orchestrator drives
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailoverConfig {
    pub nodes: Vec<NodeConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FailoverConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> NodeResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse and validate YAML configuration
    pub fn from_yaml_str(content: &str) -> NodeResult<Self> {
        let config: FailoverConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> NodeResult<()> {
        if self.nodes.is_empty() {
            return Err(NodeError::Config("at least one node is required".to_string()));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !node.identity().has_valid_address() {
                return Err(NodeError::Config(format!(
                    "node address '{}' is not host:port",
                    node.address
                )));
            }
            if !seen.insert(node.address.as_str()) {
                return Err(NodeError::Config(format!(
                    "node address '{}' is listed twice",
                    node.address
                )));
            }
            if node.retry.max_attempts == 0 {
                return Err(NodeError::Config(format!(
                    "node '{}' needs retry.max_attempts >= 1",
                    node.address
                )));
            }
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => Ok(()),
            other => Err(NodeError::Config(format!(
                "unknown logging format '{}'",
                other
            ))),
        }
    }

    /// Find a node by address
    pub fn node(&self, address: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|node| node.address == address)
    }
}
