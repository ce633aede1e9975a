//! OctoPrint API payloads
//!
//! Shapes of `GET /api/printer` and `GET /api/job`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OctoprintPrinterFlags {
    pub cancelling: bool,
    pub closed_or_error: bool,
    pub error: bool,
    pub finishing: bool,
    pub operational: bool,
    pub paused: bool,
    pub pausing: bool,
    pub printing: bool,
    pub ready: bool,
    pub resuming: bool,
    pub sd_ready: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OctoprintPrinterState {
    /// Human readable state, e.g. `Operational` or `Printing`
    pub text: String,
    #[serde(default)]
    pub flags: OctoprintPrinterFlags,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OctoprintTemperature {
    pub actual: Option<f64>,
    pub target: Option<f64>,
    #[serde(default)]
    pub offset: Option<f64>,
}

/// `GET /api/printer`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OctoprintPrinterInfo {
    pub state: OctoprintPrinterState,
    /// Keyed by tool name (`tool0`, `bed`, ...)
    #[serde(default)]
    pub temperature: BTreeMap<String, OctoprintTemperature>,
}

impl OctoprintPrinterInfo {
    pub fn with_flags(text: impl Into<String>, flags: OctoprintPrinterFlags) -> Self {
        Self {
            state: OctoprintPrinterState {
                text: text.into(),
                flags,
            },
            temperature: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctoprintJobFile {
    pub name: Option<String>,
    pub origin: Option<String>,
    pub size: Option<u64>,
    /// Upload time, seconds since the epoch
    pub date: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OctoprintJob {
    pub file: OctoprintJobFile,
    pub estimated_print_time: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OctoprintJobProgress {
    /// Percent done
    pub completion: Option<f64>,
    pub filepos: Option<u64>,
    pub print_time: Option<u64>,
    pub print_time_left: Option<u64>,
}

/// `GET /api/job`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctoprintJobInfo {
    pub job: OctoprintJob,
    pub progress: OctoprintJobProgress,
    pub state: String,
}
