//! Integration settings
//!
//! ```yaml
//! octoprint:
//!   scan_interval: 30
//! tolo:
//!   retry_timeout: 1
//!   retry_count: 3
//! ```
//!
//! Every key is optional.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::{octoprint, tolo};

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrationSettings {
    pub octoprint: OctoprintSettings,
    pub tolo: ToloSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctoprintSettings {
    /// Seconds between coordinator polls
    pub scan_interval: u64,
}

impl Default for OctoprintSettings {
    fn default() -> Self {
        Self {
            scan_interval: octoprint::DEFAULT_SCAN_INTERVAL.as_secs(),
        }
    }
}

impl OctoprintSettings {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToloSettings {
    /// Seconds to wait before resending a status request
    pub retry_timeout: u64,
    pub retry_count: u32,
}

impl Default for ToloSettings {
    fn default() -> Self {
        Self {
            retry_timeout: tolo::DEFAULT_RETRY_TIMEOUT.as_secs(),
            retry_count: tolo::DEFAULT_RETRY_COUNT,
        }
    }
}

impl ToloSettings {
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout)
    }
}

impl IntegrationSettings {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loading integration settings from {:?}", path);
        Self::from_yaml_str(&content)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.octoprint.scan_interval == 0 {
            return Err(ConfigError::InvalidValue {
                key: "octoprint.scan_interval".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.tolo.retry_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tolo.retry_timeout".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}
