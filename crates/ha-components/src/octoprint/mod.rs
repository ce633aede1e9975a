//! OctoPrint integration
//!
//! Polls an OctoPrint server and exposes the printer's `printing` and `error`
//! flags as binary sensors.

pub mod binary_sensor;
pub mod client;
pub mod coordinator;
pub mod models;

pub use binary_sensor::{OctoPrintBinarySensor, OctoprintFlag};
pub use client::{OctoprintClient, OctoprintError};
pub use coordinator::{
    new_coordinator, OctoprintData, OctoprintDataUpdateCoordinator, OctoprintUpdater,
};
pub use models::{OctoprintJobInfo, OctoprintPrinterFlags, OctoprintPrinterInfo};

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::FutureExt;
use ha_config_entries::{ConfigEntries, ConfigEntry, SetupError};
use ha_entity::EntityPlatform;
use ha_state_machine::StateMachine;
use tracing::{debug, info};

use crate::config::OctoprintSettings;

pub const DOMAIN: &str = "octoprint";

pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(30);

/// What a loaded OctoPrint entry keeps alive
#[derive(Clone)]
pub struct OctoprintRuntime {
    pub coordinator: Arc<OctoprintDataUpdateCoordinator>,
    pub platform: Arc<EntityPlatform>,
}

/// Set up one OctoPrint entry
///
/// Fails with `NotReady` when the first poll fails and with `AuthFailed`
/// when the API key is rejected.
pub async fn async_setup_entry(
    entry: &ConfigEntry,
    client: Arc<dyn OctoprintClient>,
    states: Arc<StateMachine>,
    scan_interval: Duration,
) -> Result<OctoprintRuntime, SetupError> {
    let coordinator = new_coordinator(&entry.entry_id, client, scan_interval);
    coordinator.first_refresh().await?;

    let platform = Arc::new(EntityPlatform::new(
        ha_entity::binary_sensor::DOMAIN,
        DOMAIN,
        states,
    ));
    let added = binary_sensor::async_setup_entry(entry, &coordinator, &platform);
    debug!("Added {} OctoPrint binary sensors", added.len());

    if !entry.pref_disable_polling {
        coordinator.start();
    }

    Ok(OctoprintRuntime {
        coordinator,
        platform,
    })
}

pub fn async_unload_entry(runtime: &OctoprintRuntime) -> bool {
    runtime.coordinator.shutdown();
    runtime.platform.reset();
    true
}

/// Builds the API client for an entry
pub type OctoprintClientFactory =
    Arc<dyn Fn(&ConfigEntry) -> Arc<dyn OctoprintClient> + Send + Sync>;

/// OctoPrint wired into the config entry lifecycle
pub struct OctoprintIntegration {
    states: Arc<StateMachine>,
    settings: OctoprintSettings,
    client_factory: OctoprintClientFactory,
    runtimes: DashMap<String, OctoprintRuntime>,
}

impl OctoprintIntegration {
    pub fn new(
        states: Arc<StateMachine>,
        settings: OctoprintSettings,
        client_factory: OctoprintClientFactory,
    ) -> Arc<Self> {
        Arc::new(Self {
            states,
            settings,
            client_factory,
            runtimes: DashMap::new(),
        })
    }

    /// Register setup and unload handlers for the `octoprint` domain
    pub fn register(self: &Arc<Self>, entries: &ConfigEntries) {
        let integration = self.clone();
        entries.register_setup_handler(
            DOMAIN,
            Arc::new(move |entry: ConfigEntry| {
                let integration = integration.clone();
                async move { integration.setup(entry).await }.boxed()
            }),
        );

        let integration = self.clone();
        entries.register_unload_handler(
            DOMAIN,
            Arc::new(move |entry: ConfigEntry| {
                let integration = integration.clone();
                async move { integration.unload(&entry) }.boxed()
            }),
        );
    }

    pub fn runtime(&self, entry_id: &str) -> Option<OctoprintRuntime> {
        self.runtimes.get(entry_id).map(|r| r.value().clone())
    }

    async fn setup(&self, entry: ConfigEntry) -> Result<(), SetupError> {
        let client = (self.client_factory)(&entry);
        let runtime = async_setup_entry(
            &entry,
            client,
            self.states.clone(),
            self.settings.scan_interval(),
        )
        .await?;

        self.runtimes.insert(entry.entry_id.clone(), runtime);
        info!("Set up OctoPrint entry {}", entry.title);
        Ok(())
    }

    fn unload(&self, entry: &ConfigEntry) -> bool {
        match self.runtimes.remove(&entry.entry_id) {
            Some((_, runtime)) => async_unload_entry(&runtime),
            None => true,
        }
    }
}
