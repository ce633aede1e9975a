//! Config entry lifecycle
//!
//! ```text
//! NotLoaded → SetupInProgress → Loaded
//!                            ↘ SetupError → SetupInProgress (retry)
//!                            ↘ SetupRetry → SetupInProgress (device came back)
//!                            ↘ MigrationError (terminal)
//!
//! Loaded/SetupError/SetupRetry → UnloadInProgress → NotLoaded
//!                                                 ↘ FailedUnload (terminal)
//! ```

use crate::entry::ConfigEntryState;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid state transition from {from:?} to {to:?}: {reason}")]
pub struct InvalidTransition {
    pub from: ConfigEntryState,
    pub to: ConfigEntryState,
    pub reason: &'static str,
}

impl ConfigEntryState {
    pub fn try_transition(
        self,
        to: ConfigEntryState,
    ) -> Result<ConfigEntryState, InvalidTransition> {
        use ConfigEntryState::*;

        let reason = match (self, to) {
            (NotLoaded, SetupInProgress)
            | (SetupInProgress, Loaded | SetupError | SetupRetry | MigrationError)
            | (SetupError | SetupRetry, SetupInProgress | UnloadInProgress)
            | (Loaded, UnloadInProgress)
            | (UnloadInProgress, NotLoaded | FailedUnload) => return Ok(to),

            (MigrationError | FailedUnload, _) => "terminal state, entry cannot recover",
            (SetupInProgress, _) => "setup in progress must finish first",
            (UnloadInProgress, _) => "unload in progress must finish first",
            (NotLoaded, _) => "must go through SetupInProgress",
            (Loaded, _) => "must go through UnloadInProgress",
            _ => "invalid state transition",
        };

        Err(InvalidTransition {
            from: self,
            to,
            reason,
        })
    }

    pub fn can_transition_to(self, to: ConfigEntryState) -> bool {
        self.try_transition(to).is_ok()
    }
}

/// Delay before the next setup attempt of an entry that was not ready
///
/// `2^min(tries, 4) * 5` seconds (5, 10, 20, 40, then 80 forever) plus up to
/// 100 ms of jitter.
pub fn calculate_retry_delay(tries: u32) -> Duration {
    let base = 2_u64.pow(tries.min(4)) * 5;
    let jitter = rand::random::<f64>() * 0.1;
    Duration::from_secs(base) + Duration::from_secs_f64(jitter)
}
