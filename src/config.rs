use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "CALLGATE_CONFIG";
pub const POLICY_ENV: &str = "CALLGATE_POLICY";

/// What a broadcaster does when a subscriber's buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait for the subscriber to make room. Stalls the call in flight.
    #[default]
    Block,
    /// Discard the item for that subscriber and move on.
    DropNewest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-subscriber channel capacity for log events, call notifications
    /// and snapshots.
    pub subscriber_buffer: usize,
    pub overflow: OverflowPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 16,
            overflow: OverflowPolicy::Block,
        }
    }
}

impl PipelineConfig {
    /// tokio channels panic on zero capacity.
    pub fn buffer(&self) -> usize {
        self.subscriber_buffer.max(1)
    }
}

/// Settings for the `callgate` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Inline access policy payload.
    pub policy: Option<String>,
    /// File holding the access policy payload. Used when `policy` is unset.
    pub policy_path: Option<PathBuf>,
    pub pipeline: PipelineConfig,
    /// Number of synthetic calls the demo driver issues.
    pub demo_calls: usize,
    pub stat_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            policy: None,
            policy_path: None,
            pipeline: PipelineConfig::default(),
            demo_calls: 10,
            stat_interval_secs: 1,
        }
    }
}

impl ServiceConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Reads `CALLGATE_CONFIG` (a JSON file) if set, then applies the
    /// `CALLGATE_POLICY` override.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path))?,
            None => Self::default(),
        };
        if let Ok(policy) = std::env::var(POLICY_ENV) {
            config.policy = Some(policy);
        }
        Ok(config)
    }

    /// Resolves the raw policy payload.
    pub fn policy_payload(&self) -> Result<String, ConfigError> {
        if let Some(policy) = &self.policy {
            return Ok(policy.clone());
        }
        let path = self.policy_path.as_ref().ok_or(ConfigError::MissingPolicy)?;
        std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })
    }
}
