mod common;

use std::collections::HashMap;
use std::time::Duration;

use common::{hass, Hass, MockNetwork, SaunaReply};
use ha_components::tolo::{self, ToloSaunaConfigFlow};
use ha_components::{IntegrationSettings, ToloSettings};
use ha_config_entries::{
    ConfigEntry, ConfigEntrySource, ConfigFlow, DhcpServiceInfo, FlowError, FlowInput, FlowResult, FlowStep,
    CONF_HOST,
};
use serde_json::json;

fn host_input(host: &str) -> FlowInput {
    HashMap::from([(CONF_HOST.to_string(), json!(host))])
}

fn with_network(network: &MockNetwork) -> Hass {
    let hass = hass();
    tolo::register_config_flow(&hass.flows, network.factory(), ToloSettings::default());
    hass
}

fn dhcp(ip: &str) -> FlowStep {
    FlowStep::Dhcp(DhcpServiceInfo::new(ip, "tolo-sauna", "aabbccddeeff"))
}

async fn add_sauna(hass: &Hass, host: &str, unique_id: Option<&str>) -> ConfigEntry {
    let mut entry = ConfigEntry::new(tolo::DOMAIN, tolo::DEFAULT_NAME).with_data(host_input(host));
    entry.unique_id = unique_id.map(str::to_string);
    hass.entries.add(entry).await.unwrap()
}

fn flow_id(hass: &Hass) -> String {
    let progress = hass.flows.progress();
    assert_eq!(progress.len(), 1, "expected one flow in progress");
    progress[0].flow_id.clone()
}

fn created_entry(hass: &Hass, result: &FlowResult) -> ConfigEntry {
    match result {
        FlowResult::CreateEntry {
            entry_id: Some(entry_id),
            ..
        } => hass.entries.get(entry_id).unwrap(),
        other => panic!("expected create_entry, got {other:?}"),
    }
}

#[tokio::test]
async fn test_user_shows_form() {
    let network = MockNetwork::new(&[]);
    let hass = with_network(&network);

    let result = hass.flows.init(tolo::DOMAIN, FlowStep::User(None)).await.unwrap();

    let form = result.as_form().unwrap();
    assert_eq!(form.step_id, "user");
    assert_eq!(form.data_schema.len(), 1);
    assert_eq!(form.data_schema[0].name, CONF_HOST);
    assert_eq!(form.data_schema[0].required, Some(true));
    assert!(form.errors.is_empty());
    assert!(network.contacted().is_empty());
}

#[tokio::test]
async fn test_user_cannot_connect_then_succeeds() {
    let network = MockNetwork::new(&[("192.168.1.50", SaunaReply::Status)]);
    let hass = with_network(&network);
    hass.flows.init(tolo::DOMAIN, FlowStep::User(None)).await.unwrap();
    let flow_id = flow_id(&hass);

    let result = hass
        .flows
        .configure(&flow_id, Some(host_input("192.168.1.49")))
        .await
        .unwrap();

    let form = result.as_form().unwrap();
    assert_eq!(form.step_id, "user");
    assert_eq!(form.errors.get("base").map(String::as_str), Some("cannot_connect"));
    assert!(hass.entries.is_empty());

    let result = hass
        .flows
        .configure(&flow_id, Some(host_input("192.168.1.50")))
        .await
        .unwrap();

    let entry = created_entry(&hass, &result);
    assert_eq!(entry.title, "TOLO Sauna");
    assert_eq!(entry.data_str(CONF_HOST), Some("192.168.1.50"));
    assert_eq!(entry.source, ConfigEntrySource::User);
    assert_eq!(entry.version, 1);
    assert!(entry.unique_id.is_none());
    assert_eq!(network.contacted(), vec!["192.168.1.49", "192.168.1.50"]);
    assert!(hass.flows.progress().is_empty());
}

#[tokio::test]
async fn test_user_empty_status_is_cannot_connect() {
    let network = MockNetwork::new(&[("192.168.1.50", SaunaReply::Empty)]);
    let hass = with_network(&network);

    let result = hass
        .flows
        .init(tolo::DOMAIN, FlowStep::User(Some(host_input("192.168.1.50"))))
        .await
        .unwrap();

    let form = result.as_form().unwrap();
    assert_eq!(form.errors.get("base").map(String::as_str), Some("cannot_connect"));
}

#[tokio::test]
async fn test_user_host_already_configured() {
    let network = MockNetwork::new(&[("192.168.1.50", SaunaReply::Status)]);
    let hass = with_network(&network);
    add_sauna(&hass, "192.168.1.50", None).await;

    let result = hass
        .flows
        .init(tolo::DOMAIN, FlowStep::User(Some(host_input("192.168.1.50"))))
        .await
        .unwrap();

    assert_eq!(result.abort_reason(), Some("already_configured"));
    assert!(network.contacted().is_empty());
    assert_eq!(hass.entries.len(), 1);
}

#[tokio::test]
async fn test_user_client_error_ends_flow() {
    let network = MockNetwork::new(&[("192.168.1.50", SaunaReply::Broken)]);
    let hass = with_network(&network);

    let result = hass
        .flows
        .init(tolo::DOMAIN, FlowStep::User(Some(host_input("192.168.1.50"))))
        .await;

    assert!(matches!(result, Err(FlowError::Handler(_))));
    assert!(hass.flows.progress().is_empty());
}

#[tokio::test]
async fn test_dhcp_client_error_releases_device() {
    let network = MockNetwork::new(&[("192.168.1.77", SaunaReply::Broken)]);
    let hass = with_network(&network);

    let result = hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.77")).await;
    assert!(matches!(result, Err(FlowError::Handler(_))));
    assert!(hass.flows.progress().is_empty());

    // the device is not held by the failed flow, so it is checked again
    let result = hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.77")).await;
    assert!(matches!(result, Err(FlowError::Handler(_))));
    assert_eq!(network.contacted(), vec!["192.168.1.77", "192.168.1.77"]);
    assert!(hass.flows.progress().is_empty());
}

#[tokio::test]
async fn test_retry_settings_reach_client() {
    let network = MockNetwork::new(&[("192.168.1.50", SaunaReply::Status)]);
    let hass = hass();
    let settings =
        IntegrationSettings::from_yaml_str("tolo:\n  retry_timeout: 2\n  retry_count: 5\n").unwrap();
    tolo::register_config_flow(&hass.flows, network.factory(), settings.tolo);

    hass.flows
        .init(tolo::DOMAIN, FlowStep::User(Some(host_input("192.168.1.50"))))
        .await
        .unwrap();

    assert_eq!(network.requests(), vec![(Duration::from_secs(2), 5)]);
}

#[tokio::test]
async fn test_dhcp_confirm_creates_entry() {
    let network = MockNetwork::new(&[("192.168.1.77", SaunaReply::Status)]);
    let hass = with_network(&network);

    let result = hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.77")).await.unwrap();

    let form = result.as_form().unwrap();
    assert_eq!(form.step_id, "confirm");
    assert!(form.data_schema.is_empty());
    assert_eq!(
        form.description_placeholders.get(CONF_HOST).map(String::as_str),
        Some("192.168.1.77")
    );

    let flow_id = flow_id(&hass);
    let result = hass
        .flows
        .configure(&flow_id, Some(HashMap::new()))
        .await
        .unwrap();

    let entry = created_entry(&hass, &result);
    assert_eq!(entry.title, "TOLO Sauna");
    assert_eq!(entry.data_str(CONF_HOST), Some("192.168.1.77"));
    assert_eq!(entry.unique_id.as_deref(), Some("aa:bb:cc:dd:ee:ff"));
    assert_eq!(entry.source, ConfigEntrySource::Dhcp);
}

#[tokio::test]
async fn test_dhcp_not_a_sauna() {
    let network = MockNetwork::new(&[]);
    let hass = with_network(&network);

    let result = hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.77")).await.unwrap();

    assert_eq!(result.abort_reason(), Some("not_tolo_device"));
    assert_eq!(network.contacted(), vec!["192.168.1.77"]);
    assert!(hass.flows.progress().is_empty());
}

#[tokio::test]
async fn test_dhcp_known_device_updates_host() {
    let network = MockNetwork::new(&[("192.168.1.78", SaunaReply::Status)]);
    let hass = with_network(&network);
    let entry = add_sauna(&hass, "192.168.1.20", Some("aa:bb:cc:dd:ee:ff")).await;

    let result = hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.78")).await.unwrap();

    assert_eq!(result.abort_reason(), Some("already_configured"));
    assert_eq!(
        hass.entries.get(&entry.entry_id).unwrap().data_str(CONF_HOST),
        Some("192.168.1.78")
    );
    assert!(network.contacted().is_empty());
}

#[tokio::test]
async fn test_dhcp_host_configured_without_unique_id() {
    let network = MockNetwork::new(&[("192.168.1.77", SaunaReply::Status)]);
    let hass = with_network(&network);
    add_sauna(&hass, "192.168.1.77", None).await;

    let result = hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.77")).await.unwrap();

    assert_eq!(result.abort_reason(), Some("already_configured"));
}

#[tokio::test]
async fn test_dhcp_same_device_twice() {
    let network = MockNetwork::new(&[("192.168.1.77", SaunaReply::Status)]);
    let hass = with_network(&network);

    hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.77")).await.unwrap();
    let second = hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.77")).await.unwrap();

    assert_eq!(second.abort_reason(), Some("already_in_progress"));
    assert_eq!(hass.flows.progress().len(), 1);
}

#[tokio::test]
async fn test_confirm_after_host_was_added() {
    let network = MockNetwork::new(&[("192.168.1.77", SaunaReply::Status)]);
    let hass = with_network(&network);
    hass.flows.init(tolo::DOMAIN, dhcp("192.168.1.77")).await.unwrap();
    let flow_id = flow_id(&hass);

    // the user adds the same sauna by hand while the discovery waits
    add_sauna(&hass, "192.168.1.77", None).await;

    let result = hass
        .flows
        .configure(&flow_id, Some(HashMap::new()))
        .await
        .unwrap();
    assert_eq!(result.abort_reason(), Some("already_configured"));
    assert_eq!(hass.entries.len(), 1);
}

#[tokio::test]
async fn test_unknown_step() {
    let network = MockNetwork::new(&[]);
    let hass = with_network(&network);
    let flow = ToloSaunaConfigFlow::new(network.factory(), ToloSettings::default());
    assert_eq!(flow.domain(), tolo::DOMAIN);

    // confirm without a discovered host is not a valid entry point
    let result = hass
        .flows
        .init(
            tolo::DOMAIN,
            FlowStep::Submit {
                step_id: "confirm".to_string(),
                user_input: None,
            },
        )
        .await;
    assert!(matches!(result, Err(FlowError::UnknownStep(_))));
    assert!(network.contacted().is_empty());
}
