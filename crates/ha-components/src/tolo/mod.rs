//! TOLO Sauna integration

pub mod client;
pub mod config_flow;

pub use client::{ToloClient, ToloClientFactory, ToloError, ToloStatusInfo};
pub use config_flow::ToloSaunaConfigFlow;

use std::time::Duration;

use ha_config_entries::FlowManager;

use crate::config::ToloSettings;

pub const DOMAIN: &str = "tolo";

pub const DEFAULT_NAME: &str = "TOLO Sauna";

pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Make the TOLO config flow available to `flows`
pub fn register_config_flow(
    flows: &FlowManager,
    client_factory: ToloClientFactory,
    settings: ToloSettings,
) {
    flows.register(DOMAIN, ToloSaunaConfigFlow::factory(client_factory, settings));
}
