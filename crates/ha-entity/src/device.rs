//! Device information attached to entities

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Describes the physical device behind an entity
///
/// Entities with the same identifiers belong to the same device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// `(integration domain, device id)` pairs
    pub identifiers: BTreeSet<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<String>,
}

impl DeviceInfo {
    pub fn new(domain: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            identifiers: BTreeSet::from([(domain.into(), device_id.into())]),
            ..Default::default()
        }
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sw_version(mut self, version: impl Into<String>) -> Self {
        self.sw_version = Some(version.into());
        self
    }

    pub fn has_identifier(&self, domain: &str, device_id: &str) -> bool {
        self.identifiers
            .iter()
            .any(|(d, id)| d == domain && id == device_id)
    }
}
