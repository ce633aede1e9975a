//! Entity state snapshots

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Context, EntityId, MAX_STATE_LENGTH, STATE_UNAVAILABLE, STATE_UNKNOWN};

/// The state of one entity at one point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub entity_id: EntityId,

    /// Value such as "on", "off", "unknown" or "unavailable"
    pub state: String,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    /// Last time the value changed
    pub last_changed: DateTime<Utc>,

    /// Last time the value or the attributes were written
    pub last_updated: DateTime<Utc>,

    pub context: Context,
}

impl State {
    pub fn new(
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id,
            state: clamp_state(state.into()),
            attributes,
            last_changed: now,
            last_updated: now,
            context,
        }
    }

    /// Successor of this state; `last_changed` is kept when the value is unchanged
    pub fn with_update(
        &self,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> Self {
        let now = Utc::now();
        let state = clamp_state(state.into());
        let last_changed = if state == self.state {
            self.last_changed
        } else {
            now
        };

        Self {
            entity_id: self.entity_id.clone(),
            state,
            attributes,
            last_changed,
            last_updated: now,
            context,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == STATE_UNAVAILABLE
    }

    pub fn is_unknown(&self) -> bool {
        self.state == STATE_UNKNOWN
    }

    /// Typed attribute lookup
    pub fn attribute<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.attributes
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

fn clamp_state(state: String) -> String {
    if state.len() > MAX_STATE_LENGTH {
        STATE_UNKNOWN.to_string()
    } else {
        state
    }
}

impl PartialEq for State {
    // timestamps and context are not compared
    fn eq(&self, other: &Self) -> bool {
        self.entity_id == other.entity_id
            && self.state == other.state
            && self.attributes == other.attributes
    }
}
