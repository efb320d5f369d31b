//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a phaseguard node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fewest blocks between admission and a phased transaction's finality height.
    #[serde(default = "default_min_phasing_duration")]
    pub min_phasing_duration: u32,

    /// Most blocks between admission and a phased transaction's finality height.
    #[serde(default = "default_max_phasing_duration")]
    pub max_phasing_duration: u32,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_min_phasing_duration() -> u32 {
    1
}

/// Two weeks of 1440 blocks a day.
fn default_max_phasing_duration() -> u32 {
    14 * 1440
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string and check it.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Reject settings the node cannot run with.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.log_format()?;
        if self.min_phasing_duration == 0 {
            return Err(NodeError::Config(
                "min_phasing_duration must be at least 1".to_string(),
            ));
        }
        if self.min_phasing_duration > self.max_phasing_duration {
            return Err(NodeError::Config(format!(
                "min_phasing_duration {} exceeds max_phasing_duration {}",
                self.min_phasing_duration, self.max_phasing_duration
            )));
        }
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            log_level: default_log_level(),
            min_phasing_duration: default_min_phasing_duration(),
            max_phasing_duration: default_max_phasing_duration(),
            enable_metrics: false,
        }
    }
}
