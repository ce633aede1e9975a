//! Config Entries
//!
//! Config entries represent one configured instance of an integration (one
//! printer, one sauna). This crate owns their persistence and lifecycle, and
//! the config flows that create them.
//!
//! # Key Types
//!
//! - [`ConfigEntry`] - A single integration configuration
//! - [`ConfigEntries`] - Store and lifecycle manager for all entries
//! - [`ConfigFlow`] - A step-based wizard producing a [`FlowResult`] per step
//! - [`FlowManager`] - Routes steps to flows and turns finished flows into entries
//!
//! # Storage
//!
//! Entries are persisted in `.storage/core.config_entries` inside a
//! versioned JSON envelope.

pub mod discovery;
pub mod entry;
pub mod flow;
pub mod flow_manager;
pub mod manager;
pub mod state_machine;
pub mod storage;

pub use discovery::DhcpServiceInfo;

pub use entry::{
    ConfigEntry, ConfigEntryDisabledBy, ConfigEntrySource, ConfigEntryState, ConfigEntryUpdate,
};

pub use flow::{
    ConfigFlow, FlowContext, FlowError, FlowForm, FlowInput, FlowProgress, FlowResult,
    FlowResultOr, FlowStep, FormField,
};

pub use flow_manager::{FlowFactory, FlowManager};

pub use manager::{
    ConfigEntries, ConfigEntriesData, ConfigEntriesError, ConfigEntriesResult, SetupError,
    SetupHandler, UnloadHandler, STORAGE_KEY, STORAGE_MINOR_VERSION, STORAGE_VERSION,
};

pub use state_machine::{calculate_retry_delay, InvalidTransition};

pub use storage::{Storable, Storage, StorageError, StorageFile, StorageResult};

/// Data key holding the host name or IP address of a device
pub const CONF_HOST: &str = "host";
