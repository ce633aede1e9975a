//! Call throttling

use chrono::{DateTime, Duration, Utc};
use std::future::Future;
use tokio::sync::Mutex;
use tracing::trace;

#[derive(Debug, Default)]
struct ThrottleState {
    /// Last time a call got past `min_time`
    last_call: Option<DateTime<Utc>>,
    /// Last time the wrapped function actually ran (used with `limit_no_throttle`)
    last_run: Option<DateTime<Utc>>,
}

/// Limits how often a function runs
///
/// A call runs only if more than `min_time` passed since the previous one;
/// otherwise it returns `None`. A forced call skips the `min_time` check but
/// is still held to `limit_no_throttle` when one is set. A call arriving
/// while another is running is throttled too.
///
/// Each `Throttle` value keeps its own history, so embedding one in a struct
/// throttles per instance.
#[derive(Debug)]
pub struct Throttle {
    min_time: Duration,
    limit_no_throttle: Option<Duration>,
    state: Mutex<ThrottleState>,
}

impl Throttle {
    pub fn new(min_time: Duration) -> Self {
        Self {
            min_time,
            limit_no_throttle: None,
            state: Mutex::new(ThrottleState::default()),
        }
    }

    /// Minimum spacing that even forced calls must respect
    pub fn with_limit_no_throttle(mut self, limit: Duration) -> Self {
        self.limit_no_throttle = Some(limit);
        self
    }

    pub fn call<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        self.call_at(Utc::now(), false, f)
    }

    /// Run `f` ignoring `min_time`
    pub fn call_forced<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        self.call_at(Utc::now(), true, f)
    }

    /// Same as [`Throttle::call`] with an explicit clock reading
    pub fn call_at<T>(&self, now: DateTime<Utc>, force: bool, f: impl FnOnce() -> T) -> Option<T> {
        let mut state = self.state.try_lock().ok()?;
        if self.admit(&mut state, now, force) {
            Some(f())
        } else {
            None
        }
    }

    /// Async form; the throttle stays busy until the future completes
    pub async fn call_async<T, F, Fut>(&self, force: bool, f: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let mut state = self.state.try_lock().ok()?;
        if self.admit(&mut state, Utc::now(), force) {
            Some(f().await)
        } else {
            None
        }
    }

    fn admit(&self, state: &mut ThrottleState, now: DateTime<Utc>, force: bool) -> bool {
        let outer_due = force
            || state
                .last_call
                .map_or(true, |last| now - last > self.min_time);
        if !outer_due {
            trace!("Call throttled");
            return false;
        }
        state.last_call = Some(now);

        if let Some(limit) = self.limit_no_throttle {
            let inner_due = state.last_run.map_or(true, |last| now - last > limit);
            if !inner_due {
                trace!("Forced call throttled by limit_no_throttle");
                return false;
            }
        }
        state.last_run = Some(now);
        true
    }
}
