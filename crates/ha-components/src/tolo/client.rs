//! TOLO Sauna control unit client interface
//!
//! The control unit speaks a UDP protocol; requests are resent until a reply
//! arrives or the retries run out. Calls block the calling thread.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToloError {
    /// No reply after all retries
    #[error("response timed out")]
    ResponseTimedOut,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Status report of a sauna control unit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToloStatusInfo {
    pub power_on: bool,
    /// Degrees Celsius
    pub current_temperature: i32,
    /// Percent
    pub current_humidity: u8,
    pub fan_on: bool,
    pub lamp_on: bool,
    pub water_level_percent: u8,
    pub flow_in: bool,
    pub flow_out: bool,
}

pub trait ToloClient: Send {
    /// Ask for the device status, resending every `resend_timeout` up to
    /// `retries` times; `Ok(None)` when the reply carried no status
    fn get_status_info(
        &self,
        resend_timeout: Duration,
        retries: u32,
    ) -> Result<Option<ToloStatusInfo>, ToloError>;
}

/// Builds a client for a host
pub type ToloClientFactory = Arc<dyn Fn(&str) -> Box<dyn ToloClient> + Send + Sync>;
