//! Entity trait

use std::collections::HashMap;
use std::sync::Arc;

use ha_update_coordinator::{DataUpdateCoordinator, UpdateListener, UpdateMethod};

use crate::device::DeviceInfo;

/// A single value exposed by an integration
pub trait Entity: Send + Sync + 'static {
    /// Stable id used to recognise the entity across restarts
    fn unique_id(&self) -> Option<String> {
        None
    }

    fn name(&self) -> String;

    fn device_info(&self) -> Option<DeviceInfo> {
        None
    }

    fn device_class(&self) -> Option<&str> {
        None
    }

    fn available(&self) -> bool {
        true
    }

    /// Current value; `None` is written as `unknown`
    fn state(&self) -> Option<String>;

    fn extra_state_attributes(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }

    /// Fires whenever the entity has new data to write
    fn update_listener(&self) -> Option<UpdateListener> {
        None
    }
}

/// Entity backed by a [`DataUpdateCoordinator`]
///
/// Available while the coordinator's last update succeeded, and updated
/// after every refresh.
pub struct CoordinatorEntity<U: UpdateMethod> {
    coordinator: Arc<DataUpdateCoordinator<U>>,
}

impl<U: UpdateMethod> CoordinatorEntity<U> {
    pub fn new(coordinator: Arc<DataUpdateCoordinator<U>>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<DataUpdateCoordinator<U>> {
        &self.coordinator
    }

    pub fn data(&self) -> Option<Arc<U::Data>> {
        self.coordinator.data()
    }

    pub fn available(&self) -> bool {
        self.coordinator.last_update_success()
    }

    pub fn update_listener(&self) -> Option<UpdateListener> {
        Some(self.coordinator.listen())
    }
}
