//! Config Entries Manager
//!
//! Stores config entries, persists them, and drives their setup/unload
//! lifecycle through the handlers integrations register per domain.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::entry::{ConfigEntry, ConfigEntryState, ConfigEntryUpdate};
use crate::state_machine::{calculate_retry_delay, InvalidTransition};
use crate::storage::{Storable, Storage, StorageError, StorageResult};

/// Storage key for config entries
pub const STORAGE_KEY: &str = "core.config_entries";
/// Current storage version
pub const STORAGE_VERSION: u32 = 1;
/// Current minor version
pub const STORAGE_MINOR_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigEntriesError {
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists for domain {domain} with unique_id {unique_id}")]
    AlreadyExists { domain: String, unique_id: String },

    #[error("Cannot unload entry in state {0:?}")]
    CannotUnload(ConfigEntryState),

    #[error("Setup failed: {0}")]
    SetupFailed(String),

    #[error("Setup not ready: {reason}; retrying in {retry_in:?}")]
    NotReady { reason: String, retry_in: Duration },

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type ConfigEntriesResult<T> = Result<T, ConfigEntriesError>;

/// Failure reported by an integration's setup handler
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SetupError {
    /// Device temporarily unreachable; the entry should be retried later
    #[error("{0}")]
    NotReady(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("{0}")]
    Failed(String),
}

/// Persisted form of all entries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigEntriesData {
    pub entries: Vec<ConfigEntry>,
}

impl Storable for ConfigEntriesData {
    const KEY: &'static str = STORAGE_KEY;
    const VERSION: u32 = STORAGE_VERSION;
    const MINOR_VERSION: u32 = STORAGE_MINOR_VERSION;
}

/// Sets up an integration for one entry
pub type SetupHandler =
    Arc<dyn Fn(ConfigEntry) -> BoxFuture<'static, Result<(), SetupError>> + Send + Sync>;

/// Tears an entry down; `false` means the integration could not unload it
pub type UnloadHandler = Arc<dyn Fn(ConfigEntry) -> BoxFuture<'static, bool> + Send + Sync>;

/// Config Entries Manager
///
/// Entries are indexed by id, by domain and by `(domain, unique_id)`.
/// Every mutation is written through to storage.
pub struct ConfigEntries {
    storage: Arc<Storage>,

    /// Primary index: entry_id -> ConfigEntry
    entries: DashMap<String, ConfigEntry>,

    /// Index: domain -> set of entry_ids
    by_domain: DashMap<String, HashSet<String>>,

    /// Index: (domain, unique_id) -> entry_id
    by_unique_id: DashMap<(String, String), String>,

    /// Serialises setup and unload
    setup_lock: Mutex<()>,

    /// Held across snapshot, write and rename
    save_lock: Mutex<()>,

    setup_handlers: DashMap<String, SetupHandler>,
    unload_handlers: DashMap<String, UnloadHandler>,
}

impl ConfigEntries {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self {
            storage,
            entries: DashMap::new(),
            by_domain: DashMap::new(),
            by_unique_id: DashMap::new(),
            setup_lock: Mutex::new(()),
            save_lock: Mutex::new(()),
            setup_handlers: DashMap::new(),
            unload_handlers: DashMap::new(),
        }
    }

    pub async fn load(&self) -> StorageResult<()> {
        if let Some(file) = self.storage.load::<ConfigEntriesData>().await? {
            info!(
                "Loading {} config entries from storage (v{}.{})",
                file.data.entries.len(),
                file.version,
                file.minor_version
            );

            for entry in file.data.entries {
                self.index_entry(entry);
            }
        }
        Ok(())
    }

    pub async fn save(&self) -> StorageResult<()> {
        let _lock = self.save_lock.lock().await;
        let data = ConfigEntriesData {
            entries: self.iter().collect(),
        };
        self.storage.save(&data).await?;
        debug!("Saved {} config entries to storage", data.entries.len());
        Ok(())
    }

    fn index_entry(&self, entry: ConfigEntry) {
        self.by_domain
            .entry(entry.domain.clone())
            .or_default()
            .insert(entry.entry_id.clone());

        if let Some(ref unique_id) = entry.unique_id {
            self.by_unique_id.insert(
                (entry.domain.clone(), unique_id.clone()),
                entry.entry_id.clone(),
            );
        }

        self.entries.insert(entry.entry_id.clone(), entry);
    }

    fn unindex_entry(&self, entry: &ConfigEntry) {
        if let Some(mut ids) = self.by_domain.get_mut(&entry.domain) {
            ids.remove(&entry.entry_id);
        }

        if let Some(ref unique_id) = entry.unique_id {
            self.by_unique_id
                .remove(&(entry.domain.clone(), unique_id.clone()));
        }

        self.entries.remove(&entry.entry_id);
    }

    pub fn get(&self, entry_id: &str) -> Option<ConfigEntry> {
        self.entries.get(entry_id).map(|r| r.value().clone())
    }

    pub fn get_by_domain(&self, domain: &str) -> Vec<ConfigEntry> {
        let ids: Vec<String> = self
            .by_domain
            .get(domain)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn get_by_unique_id(&self, domain: &str, unique_id: &str) -> Option<ConfigEntry> {
        let entry_id = self
            .by_unique_id
            .get(&(domain.to_string(), unique_id.to_string()))
            .map(|r| r.value().clone())?;
        self.get(&entry_id)
    }

    /// Entries of `domain` whose data contains every pair in `matcher`
    pub fn entries_match(
        &self,
        domain: &str,
        matcher: &HashMap<String, serde_json::Value>,
    ) -> Vec<ConfigEntry> {
        self.get_by_domain(domain)
            .into_iter()
            .filter(|entry| entry.data_matches(matcher))
            .collect()
    }

    /// Add a new entry; rejects a second entry with the same unique id
    pub async fn add(&self, entry: ConfigEntry) -> ConfigEntriesResult<ConfigEntry> {
        if let Some(ref unique_id) = entry.unique_id {
            if self.get_by_unique_id(&entry.domain, unique_id).is_some() {
                return Err(ConfigEntriesError::AlreadyExists {
                    domain: entry.domain.clone(),
                    unique_id: unique_id.clone(),
                });
            }
        }

        self.index_entry(entry.clone());
        if let Err(err) = self.save().await {
            self.unindex_entry(&entry);
            return Err(err.into());
        }

        info!(
            "Added config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry.entry_id
        );

        Ok(entry)
    }

    pub async fn update(
        &self,
        entry_id: &str,
        update: ConfigEntryUpdate,
    ) -> ConfigEntriesResult<ConfigEntry> {
        let previous = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        self.unindex_entry(&previous);
        let mut entry = previous.clone();

        if let Some(title) = update.title {
            entry.title = title;
        }
        if let Some(data) = update.data {
            entry.data = data;
        }
        if let Some(options) = update.options {
            entry.options = options;
        }
        if let Some(unique_id) = update.unique_id {
            entry.unique_id = unique_id;
        }
        if let Some(pref) = update.pref_disable_polling {
            entry.pref_disable_polling = pref;
        }
        entry.modified_at = Utc::now();

        self.index_entry(entry.clone());
        if let Err(err) = self.save().await {
            self.unindex_entry(&entry);
            self.index_entry(previous);
            return Err(err.into());
        }

        debug!("Updated config entry: {}", entry_id);
        Ok(entry)
    }

    /// Remove an entry, unloading it first if it is loaded
    pub async fn remove(&self, entry_id: &str) -> ConfigEntriesResult<ConfigEntry> {
        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        let entry = if entry.is_loaded() {
            self.unload(entry_id).await?;
            self.get(entry_id).unwrap_or(entry)
        } else {
            entry
        };

        self.unindex_entry(&entry);
        if let Err(err) = self.save().await {
            self.index_entry(entry);
            return Err(err.into());
        }

        info!(
            "Removed config entry: {} ({}) [{}]",
            entry.title, entry.domain, entry_id
        );

        Ok(entry)
    }

    /// Apply a lifecycle transition to a stored entry
    fn transition(
        &self,
        entry_id: &str,
        state: ConfigEntryState,
        reason: Option<String>,
    ) -> ConfigEntriesResult<()> {
        let mut entry = self
            .entries
            .get_mut(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;
        entry.try_set_state(state, reason)?;
        debug!("Entry {} state changed to {:?}", entry_id, state);
        Ok(())
    }

    pub fn register_setup_handler(&self, domain: &str, handler: SetupHandler) {
        self.setup_handlers.insert(domain.to_string(), handler);
        debug!("Registered setup handler for domain: {}", domain);
    }

    pub fn register_unload_handler(&self, domain: &str, handler: UnloadHandler) {
        self.unload_handlers.insert(domain.to_string(), handler);
        debug!("Registered unload handler for domain: {}", domain);
    }

    /// Set up an entry by calling its integration's setup handler
    ///
    /// A `NotReady` handler failure leaves the entry in `SetupRetry` and
    /// reports the backoff delay; any other failure leaves it in `SetupError`.
    pub async fn setup(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if entry.is_disabled() {
            debug!("Skipping setup for disabled entry: {}", entry_id);
            return Ok(());
        }

        self.transition(entry_id, ConfigEntryState::SetupInProgress, None)?;

        let handler = self
            .setup_handlers
            .get(&entry.domain)
            .map(|h| h.value().clone());
        let Some(handler) = handler else {
            debug!(
                "No setup handler for domain {}, marking as loaded",
                entry.domain
            );
            return self.transition(entry_id, ConfigEntryState::Loaded, None);
        };

        match handler(entry.clone()).await {
            Ok(()) => {
                self.transition(entry_id, ConfigEntryState::Loaded, None)?;
                info!("Setup completed for entry: {} ({})", entry.title, entry_id);
                Ok(())
            }
            Err(SetupError::NotReady(reason)) => {
                self.transition(
                    entry_id,
                    ConfigEntryState::SetupRetry,
                    Some(reason.clone()),
                )?;
                let tries = self
                    .entries
                    .get_mut(entry_id)
                    .map(|mut e| e.increment_tries())
                    .unwrap_or(1);
                let retry_in = calculate_retry_delay(tries - 1);
                warn!(
                    "Config entry '{}' for {} integration not ready yet: {}; retrying in {:.0}s",
                    entry.title,
                    entry.domain,
                    reason,
                    retry_in.as_secs_f64()
                );
                Err(ConfigEntriesError::NotReady { reason, retry_in })
            }
            Err(err) => {
                let reason = err.to_string();
                warn!("Setup failed for entry {}: {}", entry_id, reason);
                self.transition(
                    entry_id,
                    ConfigEntryState::SetupError,
                    Some(reason.clone()),
                )?;
                Err(ConfigEntriesError::SetupFailed(reason))
            }
        }
    }

    /// Unload an entry
    ///
    /// Only loaded entries call the unload handler; entries that failed setup
    /// just return to `NotLoaded`.
    pub async fn unload(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        let _lock = self.setup_lock.lock().await;

        let entry = self
            .get(entry_id)
            .ok_or_else(|| ConfigEntriesError::NotFound(entry_id.to_string()))?;

        if !entry.state.is_recoverable() {
            return Err(ConfigEntriesError::CannotUnload(entry.state));
        }
        if entry.state == ConfigEntryState::NotLoaded {
            return Ok(());
        }

        self.transition(entry_id, ConfigEntryState::UnloadInProgress, None)?;

        let handler = self
            .unload_handlers
            .get(&entry.domain)
            .map(|h| h.value().clone());
        let unloaded = match handler {
            Some(handler) if entry.is_loaded() => handler(entry.clone()).await,
            _ => true,
        };

        if unloaded {
            self.transition(entry_id, ConfigEntryState::NotLoaded, None)?;
            info!("Unloaded entry: {} ({})", entry.title, entry_id);
        } else {
            warn!("Integration {} failed to unload {}", entry.domain, entry_id);
            self.transition(entry_id, ConfigEntryState::FailedUnload, None)?;
        }
        Ok(())
    }

    pub async fn reload(&self, entry_id: &str) -> ConfigEntriesResult<()> {
        self.unload(entry_id).await?;
        self.setup(entry_id).await
    }

    pub fn entry_ids(&self) -> Vec<String> {
        self.entries.iter().map(|r| r.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ConfigEntry> + '_ {
        self.entries.iter().map(|r| r.value().clone())
    }

    /// Set up every entry, collecting per-entry results
    pub async fn setup_all(&self) -> Vec<(String, ConfigEntriesResult<()>)> {
        let mut results = Vec::new();
        for entry_id in self.entry_ids() {
            let result = self.setup(&entry_id).await;
            results.push((entry_id, result));
        }
        results
    }
}
