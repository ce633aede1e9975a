//! Config Entry types
//!
//! A ConfigEntry represents a single instance of an integration's configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::state_machine::InvalidTransition;

/// Config entry lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryState {
    /// Initial state, not yet set up
    #[default]
    NotLoaded,
    /// Currently being configured (non-recoverable)
    SetupInProgress,
    /// Successfully set up (recoverable)
    Loaded,
    /// Setup failed (recoverable)
    SetupError,
    /// Device not ready, waiting to retry setup (recoverable)
    SetupRetry,
    /// Version migration failed (not recoverable)
    MigrationError,
    /// Currently unloading (non-recoverable)
    UnloadInProgress,
    /// Unload failed (not recoverable)
    FailedUnload,
}

impl ConfigEntryState {
    /// Check if the entry can be unloaded/reloaded from this state
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ConfigEntryState::Loaded
                | ConfigEntryState::SetupError
                | ConfigEntryState::SetupRetry
                | ConfigEntryState::NotLoaded
        )
    }
}

/// How the entry came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntrySource {
    /// Configured via UI/API
    #[default]
    User,
    /// Imported from YAML config
    Import,
    /// DHCP discovery
    Dhcp,
    /// mDNS/Bonjour discovery
    Zeroconf,
    /// UPnP/SSDP discovery
    Ssdp,
    /// User hiding a discovery
    Ignore,
    /// Re-authentication flow
    Reauth,
}

impl ConfigEntrySource {
    pub fn is_discovery(&self) -> bool {
        matches!(self, Self::Dhcp | Self::Zeroconf | Self::Ssdp)
    }
}

/// Reason an entry was disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigEntryDisabledBy {
    User,
}

/// A configuration entry for an integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigEntry {
    /// Unique identifier (ULID)
    pub entry_id: String,

    /// Integration domain (e.g., "tolo", "octoprint")
    pub domain: String,

    /// Human-readable display name
    pub title: String,

    /// Connection data collected by the config flow
    #[serde(default)]
    pub data: HashMap<String, serde_json::Value>,

    /// User-configurable options
    #[serde(default)]
    pub options: HashMap<String, serde_json::Value>,

    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default = "default_version")]
    pub minor_version: u32,

    /// Identifies the physical device, used to prevent duplicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_id: Option<String>,

    #[serde(default)]
    pub source: ConfigEntrySource,

    /// Current lifecycle state (not persisted)
    #[serde(skip, default)]
    pub state: ConfigEntryState,

    /// Why the entry is in a failed state (not persisted)
    #[serde(skip, default)]
    pub reason: Option<String>,

    /// Setup attempts since the last settled state (not persisted)
    #[serde(skip, default)]
    pub tries: u32,

    /// Do not poll the device in the background
    #[serde(default)]
    pub pref_disable_polling: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<ConfigEntryDisabledBy>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl ConfigEntry {
    pub fn new(domain: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            entry_id: ulid::Ulid::new().to_string(),
            domain: domain.into(),
            title: title.into(),
            data: HashMap::new(),
            options: HashMap::new(),
            version: 1,
            minor_version: 1,
            unique_id: None,
            source: ConfigEntrySource::User,
            state: ConfigEntryState::NotLoaded,
            reason: None,
            tries: 0,
            pref_disable_polling: false,
            disabled_by: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    pub fn with_source(mut self, source: ConfigEntrySource) -> Self {
        self.source = source;
        self
    }

    pub fn with_version(mut self, version: u32, minor_version: u32) -> Self {
        self.version = version;
        self.minor_version = minor_version;
        self
    }

    /// String value of a data key, e.g. `entry.data_str(CONF_HOST)`
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// True if `data` contains every key/value pair of `matcher`
    pub fn data_matches(&self, matcher: &HashMap<String, serde_json::Value>) -> bool {
        matcher
            .iter()
            .all(|(key, value)| self.data.get(key) == Some(value))
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_by.is_some()
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ConfigEntryState::Loaded
    }

    /// Move to `new_state` if the lifecycle allows it
    pub fn try_set_state(
        &mut self,
        new_state: ConfigEntryState,
        reason: Option<String>,
    ) -> Result<(), InvalidTransition> {
        self.state.try_transition(new_state)?;
        self.state = new_state;
        self.reason = reason;

        if !matches!(
            new_state,
            ConfigEntryState::SetupRetry | ConfigEntryState::SetupInProgress
        ) {
            self.tries = 0;
        }

        Ok(())
    }

    /// Increment the retry counter and return the new count
    pub fn increment_tries(&mut self) -> u32 {
        self.tries += 1;
        self.tries
    }
}

/// Partial update applied by [`crate::ConfigEntries::update`]
#[derive(Debug, Default)]
pub struct ConfigEntryUpdate {
    pub title: Option<String>,
    pub data: Option<HashMap<String, serde_json::Value>>,
    pub options: Option<HashMap<String, serde_json::Value>>,
    pub unique_id: Option<Option<String>>,
    pub pref_disable_polling: Option<bool>,
}

impl ConfigEntryUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn data(mut self, data: HashMap<String, serde_json::Value>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn options(mut self, options: HashMap<String, serde_json::Value>) -> Self {
        self.options = Some(options);
        self
    }

    pub fn pref_disable_polling(mut self, disabled: bool) -> Self {
        self.pref_disable_polling = Some(disabled);
        self
    }
}
