//! OctoPrint polling

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ha_update_coordinator::{DataUpdateCoordinator, UpdateError, UpdateMethod};
use tracing::debug;

use super::client::{OctoprintClient, OctoprintError};
use super::models::{OctoprintJobInfo, OctoprintPrinterInfo};

/// One poll of an OctoPrint server
#[derive(Debug, Clone)]
pub struct OctoprintData {
    pub job: OctoprintJobInfo,
    /// `None` while the printer is disconnected from OctoPrint
    pub printer: Option<OctoprintPrinterInfo>,
    pub last_read_time: DateTime<Utc>,
}

pub struct OctoprintUpdater {
    client: Arc<dyn OctoprintClient>,
    printer_offline: AtomicBool,
}

impl OctoprintUpdater {
    pub fn new(client: Arc<dyn OctoprintClient>) -> Self {
        Self {
            client,
            printer_offline: AtomicBool::new(false),
        }
    }

    pub fn printer_offline(&self) -> bool {
        self.printer_offline.load(Ordering::Relaxed)
    }
}

fn update_error(err: OctoprintError) -> UpdateError {
    match err {
        OctoprintError::Unauthorized => UpdateError::AuthFailed(err.to_string()),
        other => UpdateError::Failed(other.to_string()),
    }
}

#[async_trait]
impl UpdateMethod for OctoprintUpdater {
    type Data = OctoprintData;

    async fn update(&self) -> Result<OctoprintData, UpdateError> {
        let job = self.client.get_job_info().await.map_err(update_error)?;

        // a disconnected printer answers 409; keep polling the job
        let printer = match self.client.get_printer_info().await {
            Ok(printer) => {
                self.printer_offline.store(false, Ordering::Relaxed);
                Some(printer)
            }
            Err(OctoprintError::PrinterOffline) => {
                if !self.printer_offline.swap(true, Ordering::Relaxed) {
                    debug!("Unable to retrieve printer information: Printer offline");
                }
                None
            }
            Err(err) => return Err(update_error(err)),
        };

        Ok(OctoprintData {
            job,
            printer,
            last_read_time: Utc::now(),
        })
    }
}

pub type OctoprintDataUpdateCoordinator = DataUpdateCoordinator<OctoprintUpdater>;

pub fn new_coordinator(
    entry_id: &str,
    client: Arc<dyn OctoprintClient>,
    interval: Duration,
) -> Arc<OctoprintDataUpdateCoordinator> {
    Arc::new(DataUpdateCoordinator::new(
        format!("octoprint-{entry_id}"),
        OctoprintUpdater::new(client),
        interval,
    ))
}
