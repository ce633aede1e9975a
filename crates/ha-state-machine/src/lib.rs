//! Entity state machine
//!
//! Holds the current [`State`] of every entity, indexed by domain, and fires
//! `state_changed` on the event bus for every write and removal.

use dashmap::DashMap;
use ha_core::events::StateChangedData;
use ha_core::{Context, EntityId, State};
use ha_event_bus::EventBus;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct StateMachine {
    states: DashMap<EntityId, State>,
    domain_index: DashMap<String, Vec<EntityId>>,
    bus: Arc<EventBus>,
}

impl StateMachine {
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            states: DashMap::new(),
            domain_index: DashMap::new(),
            bus,
        }
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Write the state of an entity and fire `state_changed`
    #[instrument(skip(self, state, attributes, context), fields(entity_id = %entity_id))]
    pub fn set(
        &self,
        entity_id: EntityId,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
        context: Context,
    ) -> State {
        let old_state = self.get(&entity_id);
        let new_state = match &old_state {
            Some(existing) => existing.with_update(state, attributes, context.clone()),
            None => State::new(entity_id.clone(), state, attributes, context.clone()),
        };

        debug!(state = %new_state.state, "Writing state");
        self.states.insert(entity_id.clone(), new_state.clone());

        if old_state.is_none() {
            self.domain_index
                .entry(entity_id.domain().to_string())
                .or_default()
                .push(entity_id.clone());
        }

        self.bus.fire_typed(
            StateChangedData {
                entity_id,
                old_state,
                new_state: Some(new_state.clone()),
            },
            context,
        );

        new_state
    }

    pub fn get(&self, entity_id: &EntityId) -> Option<State> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// State value only
    pub fn get_state(&self, entity_id: &EntityId) -> Option<String> {
        self.states.get(entity_id).map(|s| s.state.clone())
    }

    pub fn is_state(&self, entity_id: &EntityId, state: &str) -> bool {
        self.states
            .get(entity_id)
            .is_some_and(|s| s.state == state)
    }

    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.states.contains_key(entity_id)
    }

    pub fn entity_ids(&self, domain: &str) -> Vec<EntityId> {
        self.domain_index
            .get(domain)
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    pub fn all(&self) -> Vec<State> {
        self.states.iter().map(|r| r.value().clone()).collect()
    }

    /// Remove an entity; fires `state_changed` with no new state
    #[instrument(skip(self, context), fields(entity_id = %entity_id))]
    pub fn remove(&self, entity_id: &EntityId, context: Context) -> Option<State> {
        let (_, old_state) = self.states.remove(entity_id)?;

        if let Some(mut ids) = self.domain_index.get_mut(entity_id.domain()) {
            ids.retain(|id| id != entity_id);
        }

        debug!("Removed state");
        self.bus.fire_typed(
            StateChangedData {
                entity_id: entity_id.clone(),
                old_state: Some(old_state.clone()),
                new_state: None,
            },
            context,
        );

        Some(old_state)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

pub type SharedStateMachine = Arc<StateMachine>;
