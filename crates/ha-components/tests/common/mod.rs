//! Mock device clients and fixtures shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ha_components::octoprint::{
    OctoprintClient, OctoprintError, OctoprintJobInfo, OctoprintPrinterFlags,
    OctoprintPrinterInfo,
};
use ha_components::tolo::{ToloClient, ToloClientFactory, ToloError, ToloStatusInfo};
use ha_config_entries::{ConfigEntries, FlowManager, Storage};
use ha_core::events::StateChangedData;
use ha_core::EntityId;
use ha_event_bus::{EventBus, TypedReceiver};
use ha_state_machine::StateMachine;
use tempfile::TempDir;

/// OctoPrint server whose answers the test sets
pub struct MockOctoprint {
    job: Mutex<Result<OctoprintJobInfo, OctoprintError>>,
    printer: Mutex<Result<OctoprintPrinterInfo, OctoprintError>>,
    pub printer_calls: AtomicUsize,
}

impl MockOctoprint {
    pub fn new(printer: Result<OctoprintPrinterInfo, OctoprintError>) -> Arc<Self> {
        Arc::new(Self {
            job: Mutex::new(Ok(OctoprintJobInfo::default())),
            printer: Mutex::new(printer),
            printer_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_printer(&self, printer: Result<OctoprintPrinterInfo, OctoprintError>) {
        *self.printer.lock().unwrap() = printer;
    }

    pub fn set_job(&self, job: Result<OctoprintJobInfo, OctoprintError>) {
        *self.job.lock().unwrap() = job;
    }
}

#[async_trait]
impl OctoprintClient for MockOctoprint {
    async fn get_job_info(&self) -> Result<OctoprintJobInfo, OctoprintError> {
        self.job.lock().unwrap().clone()
    }

    async fn get_printer_info(&self) -> Result<OctoprintPrinterInfo, OctoprintError> {
        self.printer_calls.fetch_add(1, Ordering::SeqCst);
        self.printer.lock().unwrap().clone()
    }
}

pub fn printer(printing: bool, error: bool) -> OctoprintPrinterInfo {
    OctoprintPrinterInfo::with_flags(
        if printing { "Printing" } else { "Operational" },
        OctoprintPrinterFlags {
            operational: true,
            printing,
            error,
            ..Default::default()
        },
    )
}

/// How a mock sauna answers a status request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaunaReply {
    Status,
    Empty,
    TimedOut,
    Broken,
}

struct MockTolo {
    reply: SaunaReply,
    requests: Arc<Mutex<Vec<(Duration, u32)>>>,
}

impl ToloClient for MockTolo {
    fn get_status_info(
        &self,
        resend_timeout: Duration,
        retries: u32,
    ) -> Result<Option<ToloStatusInfo>, ToloError> {
        self.requests.lock().unwrap().push((resend_timeout, retries));
        match self.reply {
            SaunaReply::Status => Ok(Some(ToloStatusInfo {
                power_on: true,
                current_temperature: 62,
                current_humidity: 40,
                ..Default::default()
            })),
            SaunaReply::Empty => Ok(None),
            SaunaReply::TimedOut => Err(ToloError::ResponseTimedOut),
            SaunaReply::Broken => Err(ToloError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "socket not permitted",
            ))),
        }
    }
}

/// Saunas on the network by host; unknown hosts time out
pub struct MockNetwork {
    replies: HashMap<String, SaunaReply>,
    pub contacted: Arc<Mutex<Vec<String>>>,
    /// `(resend_timeout, retries)` of every status request
    pub requests: Arc<Mutex<Vec<(Duration, u32)>>>,
}

impl MockNetwork {
    pub fn new(replies: &[(&str, SaunaReply)]) -> Self {
        Self {
            replies: replies
                .iter()
                .map(|(host, reply)| (host.to_string(), *reply))
                .collect(),
            contacted: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn factory(&self) -> ToloClientFactory {
        let replies = self.replies.clone();
        let contacted = self.contacted.clone();
        let requests = self.requests.clone();
        Arc::new(move |host: &str| {
            contacted.lock().unwrap().push(host.to_string());
            let reply = replies
                .get(host)
                .copied()
                .unwrap_or(SaunaReply::TimedOut);
            Box::new(MockTolo {
                reply,
                requests: requests.clone(),
            }) as Box<dyn ToloClient>
        })
    }

    pub fn contacted(&self) -> Vec<String> {
        self.contacted.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<(Duration, u32)> {
        self.requests.lock().unwrap().clone()
    }
}

pub struct Hass {
    pub _dir: TempDir,
    pub bus: Arc<EventBus>,
    pub states: Arc<StateMachine>,
    pub entries: Arc<ConfigEntries>,
    pub flows: FlowManager,
}

pub fn hass() -> Hass {
    let dir = TempDir::new().unwrap();
    let bus = Arc::new(EventBus::new());
    let states = Arc::new(StateMachine::new(bus.clone()));
    let entries = Arc::new(ConfigEntries::new(Arc::new(Storage::new(dir.path()))));
    let flows = FlowManager::new(entries.clone());
    Hass {
        _dir: dir,
        bus,
        states,
        entries,
        flows,
    }
}

pub fn entity_id(id: &str) -> EntityId {
    id.parse().unwrap()
}

/// Wait until `entity_id` has been written with `expected`
pub async fn wait_for_state(
    changes: &mut TypedReceiver<StateChangedData>,
    states: &StateMachine,
    entity_id: &EntityId,
    expected: &str,
) {
    let wait = async {
        while !states.is_state(entity_id, expected) {
            changes.recv().await.unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(2), wait)
        .await
        .unwrap_or_else(|_| {
            panic!(
                "{entity_id} never became {expected}, is {:?}",
                states.get_state(entity_id)
            )
        });
}
