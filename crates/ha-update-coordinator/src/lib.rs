//! Data Update Coordinator
//!
//! One coordinator polls a device for every entity that shows its data.
//! Entities subscribe with [`DataUpdateCoordinator::listen`] and re-read the
//! coordinator whenever the listener fires; polling only happens while at
//! least one listener is alive.

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ha_config_entries::SetupError;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Failure of a single update
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UpdateError {
    #[error("{0}")]
    Failed(String),

    /// Credentials were rejected; retrying will not help
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}

/// Fetches fresh data for a coordinator
#[async_trait]
pub trait UpdateMethod: Send + Sync + 'static {
    type Data: Send + Sync + 'static;

    async fn update(&self) -> Result<Self::Data, UpdateError>;
}

/// Fires after every refresh, successful or not
///
/// The value is a refresh counter; only the change notification matters.
pub type UpdateListener = watch::Receiver<u64>;

struct CoordinatorState<T> {
    data: Option<Arc<T>>,
    last_update_success: bool,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<UpdateError>,
}

pub struct DataUpdateCoordinator<U: UpdateMethod> {
    name: String,
    method: U,
    update_interval: Duration,
    state: RwLock<CoordinatorState<U::Data>>,
    notify: watch::Sender<u64>,
    refresh_lock: tokio::sync::Mutex<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<U: UpdateMethod> DataUpdateCoordinator<U> {
    pub fn new(name: impl Into<String>, method: U, update_interval: Duration) -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            name: name.into(),
            method,
            update_interval,
            state: RwLock::new(CoordinatorState {
                data: None,
                last_update_success: true,
                last_updated: None,
                last_error: None,
            }),
            notify,
            refresh_lock: tokio::sync::Mutex::new(()),
            task: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    pub fn method(&self) -> &U {
        &self.method
    }

    /// Data from the last successful update
    pub fn data(&self) -> Option<Arc<U::Data>> {
        self.state.read().ok().and_then(|s| s.data.clone())
    }

    pub fn last_update_success(&self) -> bool {
        self.state
            .read()
            .map(|s| s.last_update_success)
            .unwrap_or(false)
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.read().ok().and_then(|s| s.last_updated)
    }

    pub fn last_error(&self) -> Option<UpdateError> {
        self.state.read().ok().and_then(|s| s.last_error.clone())
    }

    pub fn listen(&self) -> UpdateListener {
        self.notify.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.notify.receiver_count()
    }

    /// Run the update method once and notify listeners
    ///
    /// A failed update keeps the previous data but marks the coordinator as
    /// unsuccessful, so entities report themselves unavailable.
    pub async fn refresh(&self) -> Result<(), UpdateError> {
        let _lock = self.refresh_lock.lock().await;
        let start = Instant::now();
        let result = self.method.update().await;

        let outcome = match self.state.write() {
            Ok(mut state) => match result {
                Ok(data) => {
                    if !state.last_update_success {
                        info!("Fetching {} data recovered", self.name);
                    }
                    state.data = Some(Arc::new(data));
                    state.last_update_success = true;
                    state.last_updated = Some(Utc::now());
                    state.last_error = None;
                    Ok(())
                }
                Err(err) => {
                    if state.last_update_success {
                        error!("Error fetching {} data: {}", self.name, err);
                    }
                    state.last_update_success = false;
                    state.last_error = Some(err.clone());
                    Err(err)
                }
            },
            Err(_) => Err(UpdateError::Failed("coordinator state poisoned".to_string())),
        };

        debug!(
            "Finished fetching {} data in {:.3} seconds (success: {})",
            self.name,
            start.elapsed().as_secs_f64(),
            outcome.is_ok()
        );

        self.notify.send_modify(|generation| *generation += 1);
        outcome
    }

    /// Refresh during entry setup
    ///
    /// Failures become [`SetupError::NotReady`] so the entry is retried, or
    /// [`SetupError::AuthFailed`] when credentials were rejected.
    pub async fn first_refresh(&self) -> Result<(), SetupError> {
        self.refresh().await.map_err(|err| match err {
            UpdateError::Failed(msg) => SetupError::NotReady(msg),
            UpdateError::AuthFailed(msg) => SetupError::AuthFailed(msg),
        })
    }

    /// Start polling every `update_interval`
    ///
    /// Ticks without listeners are skipped. The loop ends on
    /// [`shutdown`](Self::shutdown) or once the coordinator is dropped.
    pub fn start(self: &Arc<Self>) {
        let coordinator = Arc::downgrade(self);
        let period = self.update_interval;

        let handle = tokio::spawn(async move {
            let first_tick = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let Some(coordinator) = coordinator.upgrade() else {
                    break;
                };
                if coordinator.listener_count() == 0 {
                    continue;
                }
                // errors are recorded in the coordinator state
                let _ = coordinator.refresh().await;
            }
        });

        if let Ok(mut task) = self.task.lock() {
            if let Some(previous) = task.replace(handle) {
                previous.abort();
            }
        }
        debug!("Started polling {} every {:?}", self.name, period);
    }

    pub fn is_polling(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|h| !h.is_finished()))
            .unwrap_or(false)
    }

    /// Stop polling
    pub fn shutdown(&self) {
        if let Ok(mut task) = self.task.lock() {
            if let Some(handle) = task.take() {
                handle.abort();
                debug!("Stopped polling {}", self.name);
            }
        }
    }
}

impl<U: UpdateMethod> Drop for DataUpdateCoordinator<U> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
