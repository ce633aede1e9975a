//! OctoPrint binary sensors

use std::sync::Arc;

use ha_config_entries::ConfigEntry;
use ha_core::EntityId;
use ha_entity::binary_sensor::state_for;
use ha_entity::{CoordinatorEntity, DeviceInfo, Entity, EntityPlatform};
use ha_update_coordinator::UpdateListener;

use super::coordinator::{OctoprintDataUpdateCoordinator, OctoprintUpdater};
use super::models::OctoprintPrinterInfo;
use super::DOMAIN;

/// Printer state flag a binary sensor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OctoprintFlag {
    Printing,
    PrintingError,
}

impl OctoprintFlag {
    pub const ALL: [OctoprintFlag; 2] = [OctoprintFlag::Printing, OctoprintFlag::PrintingError];

    pub fn label(self) -> &'static str {
        match self {
            OctoprintFlag::Printing => "Printing",
            OctoprintFlag::PrintingError => "Printing Error",
        }
    }

    pub fn extract(self, printer: &OctoprintPrinterInfo) -> bool {
        let flags = &printer.state.flags;
        match self {
            OctoprintFlag::Printing => flags.printing,
            OctoprintFlag::PrintingError => flags.error,
        }
    }
}

pub struct OctoPrintBinarySensor {
    flag: OctoprintFlag,
    device_id: String,
    coordinator: CoordinatorEntity<OctoprintUpdater>,
}

impl OctoPrintBinarySensor {
    pub fn new(
        coordinator: Arc<OctoprintDataUpdateCoordinator>,
        flag: OctoprintFlag,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            flag,
            device_id: device_id.into(),
            coordinator: CoordinatorEntity::new(coordinator),
        }
    }

    pub fn flag(&self) -> OctoprintFlag {
        self.flag
    }

    /// `None` while no printer information is available
    pub fn is_on(&self) -> Option<bool> {
        let data = self.coordinator.data()?;
        data.printer.as_ref().map(|printer| self.flag.extract(printer))
    }
}

impl Entity for OctoPrintBinarySensor {
    fn unique_id(&self) -> Option<String> {
        Some(format!("{}-{}", self.flag.label(), self.device_id))
    }

    fn name(&self) -> String {
        format!("Octoprint {}", self.flag.label())
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        Some(
            DeviceInfo::new(DOMAIN, &self.device_id)
                .with_manufacturer("Octoprint")
                .with_name("Octoprint"),
        )
    }

    fn available(&self) -> bool {
        self.coordinator.available()
    }

    fn state(&self) -> Option<String> {
        state_for(self.is_on())
    }

    fn update_listener(&self) -> Option<UpdateListener> {
        self.coordinator.update_listener()
    }
}

/// Add the binary sensors of one OctoPrint entry
///
/// The entry's unique id identifies the device; entries without one fall back
/// to their entry id.
pub fn async_setup_entry(
    entry: &ConfigEntry,
    coordinator: &Arc<OctoprintDataUpdateCoordinator>,
    platform: &EntityPlatform,
) -> Vec<EntityId> {
    let device_id = entry
        .unique_id
        .clone()
        .unwrap_or_else(|| entry.entry_id.clone());

    let entities: Vec<Arc<dyn Entity>> = OctoprintFlag::ALL
        .into_iter()
        .map(|flag| {
            Arc::new(OctoPrintBinarySensor::new(
                coordinator.clone(),
                flag,
                device_id.clone(),
            )) as Arc<dyn Entity>
        })
        .collect();

    platform.add_entities(entities)
}
