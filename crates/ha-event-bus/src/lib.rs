//! Event bus
//!
//! One broadcast channel per event type plus one for `*` subscribers.
//! Senders are created lazily on first subscription; firing an event nobody
//! listens to is a no-op.

use dashmap::DashMap;
use ha_core::{Context, Event, EventData, EventType};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{trace, warn};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

type RawEvent = Event<serde_json::Value>;

pub struct EventBus {
    channels: DashMap<EventType, broadcast::Sender<RawEvent>>,
    match_all: broadcast::Sender<RawEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (match_all, _) = broadcast::channel(capacity);
        Self {
            channels: DashMap::new(),
            match_all,
            capacity,
        }
    }

    /// Receive every event of `event_type` (`*` receives everything)
    pub fn subscribe(&self, event_type: impl Into<EventType>) -> broadcast::Receiver<RawEvent> {
        let event_type = event_type.into();
        if event_type.is_match_all() {
            return self.match_all.subscribe();
        }

        trace!(event_type = %event_type, "New subscription");
        self.channels
            .entry(event_type)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    pub fn subscribe_all(&self) -> broadcast::Receiver<RawEvent> {
        self.match_all.subscribe()
    }

    /// Receive events of `T::event_type()` with their payload decoded as `T`
    pub fn subscribe_typed<T: EventData + DeserializeOwned>(&self) -> TypedReceiver<T> {
        TypedReceiver {
            rx: self.subscribe(T::event_type()),
            _data: PhantomData,
        }
    }

    pub fn fire(&self, event: RawEvent) {
        trace!(event_type = %event.event_type, "Firing event");

        if let Some(sender) = self.channels.get(&event.event_type) {
            // no receivers left is not an error
            let _ = sender.send(event.clone());
        }
        let _ = self.match_all.send(event);
    }

    pub fn fire_typed<T: EventData + Serialize>(&self, data: T, context: Context) {
        let event = Event::typed(data, context);
        match serde_json::to_value(&event.data) {
            Ok(value) => self.fire(event.map_data(|_| value)),
            Err(err) => warn!(event_type = %event.event_type, "Dropping unserializable event: {}", err),
        }
    }

    /// Number of event types that have ever been subscribed to
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver yielding events whose payload decodes as `T`
pub struct TypedReceiver<T> {
    rx: broadcast::Receiver<RawEvent>,
    _data: PhantomData<T>,
}

impl<T: EventData + DeserializeOwned> TypedReceiver<T> {
    /// Next event; payloads that fail to decode are skipped
    pub async fn recv(&mut self) -> Result<Event<T>, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if let Ok(data) = serde_json::from_value::<T>(event.data.clone()) {
                return Ok(event.map_data(|_| data));
            }
        }
    }

    pub fn try_recv(&mut self) -> Result<Event<T>, broadcast::error::TryRecvError> {
        loop {
            let event = self.rx.try_recv()?;
            if let Ok(data) = serde_json::from_value::<T>(event.data.clone()) {
                return Ok(event.map_data(|_| data));
            }
        }
    }
}

pub type SharedEventBus = Arc<EventBus>;

#[cfg(test)]
mod tests {
    use super::*;
    use ha_core::events::StateChangedData;
    use ha_core::{EntityId, State};
    use serde_json::json;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_fire_reaches_type_and_match_all_subscribers() {
        let bus = EventBus::new();
        let mut typed = bus.subscribe("config_entry_created");
        let mut all = bus.subscribe("*");

        bus.fire(Event::new(
            "config_entry_created",
            json!({"domain": "tolo"}),
            Context::new(),
        ));

        assert_eq!(typed.recv().await.unwrap().data["domain"], "tolo");
        assert_eq!(
            all.recv().await.unwrap().event_type.as_str(),
            "config_entry_created"
        );
    }

    #[tokio::test]
    async fn test_other_types_not_delivered() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("a");

        bus.fire(Event::new("b", json!({}), Context::new()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_typed_state_changed() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_typed::<StateChangedData>();

        let entity_id = EntityId::new("binary_sensor", "octoprint_printing").unwrap();
        let new_state = State::new(entity_id.clone(), "on", HashMap::new(), Context::new());
        bus.fire_typed(
            StateChangedData {
                entity_id,
                old_state: None,
                new_state: Some(new_state),
            },
            Context::new(),
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.data.new_state.unwrap().state, "on");
        assert!(event.data.old_state.is_none());
    }
}
