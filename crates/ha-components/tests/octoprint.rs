mod common;

use std::collections::BTreeSet;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{entity_id, hass, printer, wait_for_state, MockOctoprint};
use ha_components::octoprint::{
    self, OctoPrintBinarySensor, OctoprintClient, OctoprintError, OctoprintFlag,
    OctoprintIntegration,
};
use ha_components::OctoprintSettings;
use ha_config_entries::{ConfigEntry, ConfigEntryState, SetupError};
use ha_core::attributes::FRIENDLY_NAME;
use ha_core::events::StateChangedData;
use ha_core::{STATE_OFF, STATE_ON, STATE_UNAVAILABLE, STATE_UNKNOWN};
use ha_entity::Entity;

const PRINTING: &str = "binary_sensor.octoprint_printing";
const PRINTING_ERROR: &str = "binary_sensor.octoprint_printing_error";

fn octoprint_entry() -> ConfigEntry {
    ConfigEntry::new(octoprint::DOMAIN, "OctoPrint").with_unique_id("uuid-1234")
}

#[tokio::test]
async fn test_printing_sensors_reflect_flags() {
    let hass = hass();
    let client = MockOctoprint::new(Ok(printer(true, false)));

    let runtime = octoprint::async_setup_entry(
        &octoprint_entry(),
        client,
        hass.states.clone(),
        octoprint::DEFAULT_SCAN_INTERVAL,
    )
    .await
    .unwrap();

    assert!(hass.states.is_state(&entity_id(PRINTING), STATE_ON));
    assert!(hass.states.is_state(&entity_id(PRINTING_ERROR), STATE_OFF));

    let state = hass.states.get(&entity_id(PRINTING_ERROR)).unwrap();
    assert_eq!(
        state.attribute::<String>(FRIENDLY_NAME).as_deref(),
        Some("Octoprint Printing Error")
    );
    assert!(runtime.coordinator.is_polling());

    assert!(octoprint::async_unload_entry(&runtime));
    assert!(hass.states.is_empty());
    assert!(!runtime.coordinator.is_polling());
}

#[tokio::test]
async fn test_printer_offline_is_unknown() {
    let hass = hass();
    let client = MockOctoprint::new(Err(OctoprintError::PrinterOffline));

    let runtime = octoprint::async_setup_entry(
        &octoprint_entry(),
        client.clone(),
        hass.states.clone(),
        octoprint::DEFAULT_SCAN_INTERVAL,
    )
    .await
    .unwrap();

    // the job poll succeeded, so the sensors stay available
    assert!(runtime.coordinator.last_update_success());
    assert!(runtime.coordinator.method().printer_offline());
    assert!(hass.states.is_state(&entity_id(PRINTING), STATE_UNKNOWN));
    assert!(hass.states.is_state(&entity_id(PRINTING_ERROR), STATE_UNKNOWN));

    let mut changes = hass.bus.subscribe_typed::<StateChangedData>();
    client.set_printer(Ok(printer(false, true)));
    runtime.coordinator.refresh().await.unwrap();

    wait_for_state(&mut changes, &hass.states, &entity_id(PRINTING), STATE_OFF).await;
    wait_for_state(&mut changes, &hass.states, &entity_id(PRINTING_ERROR), STATE_ON).await;
    assert!(!runtime.coordinator.method().printer_offline());

    octoprint::async_unload_entry(&runtime);
}

#[tokio::test]
async fn test_failed_update_makes_sensors_unavailable() {
    let hass = hass();
    let client = MockOctoprint::new(Ok(printer(true, false)));
    let runtime = octoprint::async_setup_entry(
        &octoprint_entry(),
        client.clone(),
        hass.states.clone(),
        octoprint::DEFAULT_SCAN_INTERVAL,
    )
    .await
    .unwrap();
    let mut changes = hass.bus.subscribe_typed::<StateChangedData>();

    client.set_job(Err(OctoprintError::Api("502 Bad Gateway".to_string())));
    assert!(runtime.coordinator.refresh().await.is_err());
    wait_for_state(&mut changes, &hass.states, &entity_id(PRINTING), STATE_UNAVAILABLE).await;
    wait_for_state(
        &mut changes,
        &hass.states,
        &entity_id(PRINTING_ERROR),
        STATE_UNAVAILABLE,
    )
    .await;
    // the failed job poll never reached the printer endpoint
    assert_eq!(client.printer_calls.load(Ordering::SeqCst), 1);

    client.set_job(Ok(Default::default()));
    runtime.coordinator.refresh().await.unwrap();
    wait_for_state(&mut changes, &hass.states, &entity_id(PRINTING), STATE_ON).await;

    octoprint::async_unload_entry(&runtime);
}

#[tokio::test]
async fn test_first_refresh_failures() {
    let hass = hass();

    let client = MockOctoprint::new(Ok(printer(false, false)));
    client.set_job(Err(OctoprintError::Unauthorized));
    let result = octoprint::async_setup_entry(
        &octoprint_entry(),
        client,
        hass.states.clone(),
        octoprint::DEFAULT_SCAN_INTERVAL,
    )
    .await;
    assert!(matches!(result, Err(SetupError::AuthFailed(_))));

    let client = MockOctoprint::new(Err(OctoprintError::Api("connection refused".to_string())));
    let result = octoprint::async_setup_entry(
        &octoprint_entry(),
        client,
        hass.states.clone(),
        octoprint::DEFAULT_SCAN_INTERVAL,
    )
    .await;
    assert!(matches!(result, Err(SetupError::NotReady(_))));

    assert!(hass.states.is_empty());
}

#[tokio::test]
async fn test_sensor_identity() {
    let client: Arc<dyn OctoprintClient> = MockOctoprint::new(Ok(printer(true, false)));
    let coordinator = octoprint::new_coordinator("entry", client, Duration::from_secs(30));
    let sensor =
        OctoPrintBinarySensor::new(coordinator.clone(), OctoprintFlag::PrintingError, "uuid-1234");

    assert_eq!(sensor.name(), "Octoprint Printing Error");
    assert_eq!(sensor.unique_id().as_deref(), Some("Printing Error-uuid-1234"));

    let device = sensor.device_info().unwrap();
    assert_eq!(
        device.identifiers,
        BTreeSet::from([("octoprint".to_string(), "uuid-1234".to_string())])
    );
    assert_eq!(device.manufacturer.as_deref(), Some("Octoprint"));
    assert_eq!(device.name.as_deref(), Some("Octoprint"));

    // nothing fetched yet
    assert_eq!(sensor.is_on(), None);
    coordinator.refresh().await.unwrap();
    assert_eq!(sensor.is_on(), Some(false));
    assert_eq!(sensor.state().as_deref(), Some(STATE_OFF));
}

#[tokio::test]
async fn test_entry_lifecycle_through_config_entries() {
    let hass = hass();
    let client = MockOctoprint::new(Ok(printer(true, false)));
    let integration = OctoprintIntegration::new(
        hass.states.clone(),
        OctoprintSettings::default(),
        Arc::new(move |_entry: &ConfigEntry| client.clone() as Arc<dyn OctoprintClient>),
    );
    integration.register(&hass.entries);

    let entry = hass.entries.add(octoprint_entry()).await.unwrap();
    hass.entries.setup(&entry.entry_id).await.unwrap();

    assert_eq!(
        hass.entries.get(&entry.entry_id).unwrap().state,
        ConfigEntryState::Loaded
    );
    assert!(hass.states.is_state(&entity_id(PRINTING), STATE_ON));
    let runtime = integration.runtime(&entry.entry_id).unwrap();
    assert_eq!(runtime.platform.len(), 2);

    hass.entries.unload(&entry.entry_id).await.unwrap();
    assert_eq!(
        hass.entries.get(&entry.entry_id).unwrap().state,
        ConfigEntryState::NotLoaded
    );
    assert!(hass.states.is_empty());
    assert!(integration.runtime(&entry.entry_id).is_none());
}

#[tokio::test]
async fn test_offline_server_retries_setup() {
    let hass = hass();
    let client = MockOctoprint::new(Ok(printer(true, false)));
    client.set_job(Err(OctoprintError::Api("connection refused".to_string())));
    let shared = client.clone();
    let integration = OctoprintIntegration::new(
        hass.states.clone(),
        OctoprintSettings::default(),
        Arc::new(move |_entry: &ConfigEntry| shared.clone() as Arc<dyn OctoprintClient>),
    );
    integration.register(&hass.entries);

    let entry = hass.entries.add(octoprint_entry()).await.unwrap();
    assert!(hass.entries.setup(&entry.entry_id).await.is_err());
    assert_eq!(
        hass.entries.get(&entry.entry_id).unwrap().state,
        ConfigEntryState::SetupRetry
    );

    client.set_job(Ok(Default::default()));
    hass.entries.setup(&entry.entry_id).await.unwrap();
    assert!(hass.states.is_state(&entity_id(PRINTING), STATE_ON));

    hass.entries.remove(&entry.entry_id).await.unwrap();
    assert!(hass.states.is_empty());
}
