//! Core types shared by the integration crates
//!
//! Entity identifiers, entity states, events and the context that ties a
//! state write back to whatever caused it.

mod context;
mod entity_id;
mod event;
mod state;

pub use context::Context;
pub use entity_id::{EntityId, EntityIdError};
pub use event::{Event, EventData, EventOrigin, EventType};
pub use state::State;

/// State value of a binary entity that is on
pub const STATE_ON: &str = "on";

/// State value of a binary entity that is off
pub const STATE_OFF: &str = "off";

/// State value written when an entity cannot tell its value
pub const STATE_UNKNOWN: &str = "unknown";

/// State value written when the entity's data source is unreachable
pub const STATE_UNAVAILABLE: &str = "unavailable";

/// Longest state value accepted; longer values are replaced by `unknown`
pub const MAX_STATE_LENGTH: usize = 255;

/// Well-known attribute keys
pub mod attributes {
    pub const FRIENDLY_NAME: &str = "friendly_name";
    pub const DEVICE_CLASS: &str = "device_class";
}

/// Event types fired by the core
pub mod events {
    use super::*;

    /// Fired whenever an entity state is written or removed
    pub const STATE_CHANGED: &str = "state_changed";

    /// Payload of [`STATE_CHANGED`]
    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    pub struct StateChangedData {
        pub entity_id: EntityId,
        pub old_state: Option<State>,
        pub new_state: Option<State>,
    }

    impl EventData for StateChangedData {
        fn event_type() -> &'static str {
            STATE_CHANGED
        }
    }
}
