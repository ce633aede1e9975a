//! Discovery payloads handed to config flows

use serde::{Deserialize, Serialize};

/// A device seen by the DHCP watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DhcpServiceInfo {
    /// IP address leased to the device
    pub ip: String,
    pub hostname: String,
    /// MAC address as reported by the watcher (lowercase, no separators)
    pub macaddress: String,
}

impl DhcpServiceInfo {
    pub fn new(
        ip: impl Into<String>,
        hostname: impl Into<String>,
        macaddress: impl Into<String>,
    ) -> Self {
        Self {
            ip: ip.into(),
            hostname: hostname.into(),
            macaddress: macaddress.into(),
        }
    }
}
