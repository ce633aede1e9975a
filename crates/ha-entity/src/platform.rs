//! Entity platform
//!
//! Holds the entities one integration added to one entity domain, e.g. the
//! OctoPrint binary sensors.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use dashmap::DashMap;
use ha_core::attributes::{DEVICE_CLASS, FRIENDLY_NAME};
use ha_core::{Context, EntityId, State, STATE_UNAVAILABLE, STATE_UNKNOWN};
use ha_state_machine::StateMachine;
use ha_util::{ensure_unique_string, slugify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::entity::Entity;

pub struct EntityPlatform {
    domain: String,
    platform: String,
    states: Arc<StateMachine>,
    entities: DashMap<EntityId, Arc<dyn Entity>>,
    /// unique_id -> entity_id
    unique_ids: DashMap<String, EntityId>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Bumped by `reset`; listeners only write while it matches their own
    generation: Arc<RwLock<u64>>,
}

impl EntityPlatform {
    pub fn new(
        domain: impl Into<String>,
        platform: impl Into<String>,
        states: Arc<StateMachine>,
    ) -> Self {
        Self {
            domain: domain.into(),
            platform: platform.into(),
            states,
            entities: DashMap::new(),
            unique_ids: DashMap::new(),
            tasks: Mutex::new(Vec::new()),
            generation: Arc::new(RwLock::new(0)),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Add entities and write their first state
    ///
    /// Entity ids are `<domain>.<slugified name>`, suffixed `_2`, `_3`, ...
    /// when taken. Entities whose unique id is already present are skipped.
    /// Must be called from within a tokio runtime.
    pub fn add_entities(&self, entities: Vec<Arc<dyn Entity>>) -> Vec<EntityId> {
        let mut added = Vec::new();

        for entity in entities {
            if let Some(unique_id) = entity.unique_id() {
                if self.unique_ids.contains_key(&unique_id) {
                    warn!(
                        "Platform {} does not generate unique IDs. ID {} already exists - ignoring {}.{}",
                        self.platform,
                        unique_id,
                        self.domain,
                        slugify(&entity.name())
                    );
                    continue;
                }
            }

            let entity_id = match self.generate_entity_id(&entity.name()) {
                Ok(id) => id,
                Err(err) => {
                    warn!("Cannot add entity {:?}: {}", entity.name(), err);
                    continue;
                }
            };

            if let Some(unique_id) = entity.unique_id() {
                self.unique_ids.insert(unique_id, entity_id.clone());
            }
            self.entities.insert(entity_id.clone(), entity.clone());
            write_state(&self.states, &entity_id, entity.as_ref());
            debug!("Added {} from {}", entity_id, self.platform);

            if let Some(mut listener) = entity.update_listener() {
                let states = self.states.clone();
                let id = entity_id.clone();
                let generation = self.generation.clone();
                let spawned_in = *generation.read().unwrap_or_else(PoisonError::into_inner);
                let handle = tokio::spawn(async move {
                    while listener.changed().await.is_ok() {
                        let written = write_current_state(
                            &generation,
                            spawned_in,
                            &states,
                            &id,
                            entity.as_ref(),
                        );
                        if !written {
                            break;
                        }
                    }
                });
                if let Ok(mut tasks) = self.tasks.lock() {
                    tasks.push(handle);
                }
            }

            added.push(entity_id);
        }

        added
    }

    fn generate_entity_id(&self, name: &str) -> Result<EntityId, ha_core::EntityIdError> {
        let taken: Vec<String> = self
            .states
            .entity_ids(&self.domain)
            .into_iter()
            .chain(self.entities.iter().map(|e| e.key().clone()))
            .map(|id| id.object_id().to_string())
            .collect();
        let object_id = ensure_unique_string(&slugify(name), &taken);
        EntityId::new(self.domain.as_str(), object_id)
    }

    /// Write the state of one of this platform's entities again
    pub fn write_state(&self, entity_id: &EntityId) -> Option<State> {
        let entity = self.entities.get(entity_id).map(|e| e.value().clone())?;
        Some(write_state(&self.states, entity_id, entity.as_ref()))
    }

    pub fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entities.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn entity_id_for(&self, unique_id: &str) -> Option<EntityId> {
        self.unique_ids.get(unique_id).map(|id| id.value().clone())
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Stop listening and remove all states of this platform
    pub fn reset(&self) {
        let mut generation = self.generation.write().unwrap_or_else(PoisonError::into_inner);
        *generation += 1;

        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }

        let ids = self.entity_ids();
        for entity_id in &ids {
            self.states.remove(entity_id, Context::new());
            self.entities.remove(entity_id);
        }
        self.unique_ids.clear();
        drop(generation);
        debug!("Reset platform {} ({} entities)", self.platform, ids.len());
    }
}

/// Write the entity's state unless the platform was reset since `spawned_in`
fn write_current_state(
    generation: &RwLock<u64>,
    spawned_in: u64,
    states: &StateMachine,
    entity_id: &EntityId,
    entity: &dyn Entity,
) -> bool {
    let current = generation.read().unwrap_or_else(PoisonError::into_inner);
    if *current != spawned_in {
        return false;
    }
    write_state(states, entity_id, entity);
    true
}

/// Project an entity onto the state machine
fn write_state(states: &StateMachine, entity_id: &EntityId, entity: &dyn Entity) -> State {
    let value = if entity.available() {
        entity.state().unwrap_or_else(|| STATE_UNKNOWN.to_string())
    } else {
        STATE_UNAVAILABLE.to_string()
    };

    let mut attributes: HashMap<String, serde_json::Value> = entity.extra_state_attributes();
    attributes.insert(FRIENDLY_NAME.to_string(), entity.name().into());
    if let Some(device_class) = entity.device_class() {
        attributes.insert(DEVICE_CLASS.to_string(), device_class.into());
    }

    states.set(entity_id.clone(), value, attributes, Context::new())
}
