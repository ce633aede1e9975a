//! Integrations
//!
//! - [`octoprint`]: binary sensors for an OctoPrint 3D printer server, fed by
//!   a polling coordinator
//! - [`tolo`]: config flow that adds a TOLO Sauna by host or DHCP discovery
//!
//! Device clients are traits; the network code talking to the devices lives
//! outside this crate.

pub mod config;
pub mod octoprint;
pub mod tolo;

pub use config::{ConfigError, ConfigResult, IntegrationSettings, OctoprintSettings, ToloSettings};
