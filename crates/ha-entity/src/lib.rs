//! Entities
//!
//! An [`Entity`] is one value an integration exposes (a binary sensor, a
//! sensor, ...). An [`EntityPlatform`] gives entities their ids, writes their
//! states to the state machine and rewrites them whenever the entity reports
//! new data.

pub mod binary_sensor;
pub mod device;
pub mod entity;
pub mod platform;

pub use device::DeviceInfo;
pub use entity::{CoordinatorEntity, Entity};
pub use platform::EntityPlatform;
