//! Tracing subscriber setup for processes embedding failover-node

use crate::config::LoggingConfig;
use crate::error::{NodeError, NodeResult};
use tracing_subscriber::EnvFilter;

/// Filter from `RUST_LOG`, falling back to the configured level
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Install the global subscriber
///
/// Fails instead of panicking when a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> NodeResult<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(config));

    let result = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "pretty" => builder.pretty().try_init(),
        other => {
            return Err(NodeError::Config(format!(
                "unknown logging format '{}'",
                other
            )));
        }
    };

    result.map_err(|e| NodeError::Config(format!("failed to install subscriber: {}", e)))
}
