//! OctoPrint API client interface

use async_trait::async_trait;
use thiserror::Error;

use super::models::{OctoprintJobInfo, OctoprintPrinterInfo};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OctoprintError {
    /// OctoPrint is up but the printer is disconnected (HTTP 409)
    #[error("printer is offline")]
    PrinterOffline,

    /// The API key was rejected
    #[error("unauthorized: invalid API key")]
    Unauthorized,

    #[error("API error: {0}")]
    Api(String),
}

/// Talks to one OctoPrint server
#[async_trait]
pub trait OctoprintClient: Send + Sync {
    async fn get_job_info(&self) -> Result<OctoprintJobInfo, OctoprintError>;

    async fn get_printer_info(&self) -> Result<OctoprintPrinterInfo, OctoprintError>;
}
