//! Flow manager
//!
//! Starts config flows, routes submitted forms to them and stores the entries
//! they create.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::entry::ConfigEntry;
use crate::flow::{
    ConfigFlow, FlowContext, FlowError, FlowInput, FlowProgress, FlowResult, FlowResultOr,
    FlowStep,
};
use crate::manager::{ConfigEntries, ConfigEntriesError};

/// Builds a fresh flow for a handler
pub type FlowFactory = Arc<dyn Fn() -> Box<dyn ConfigFlow> + Send + Sync>;

struct ActiveFlow {
    flow: Box<dyn ConfigFlow>,
    ctx: FlowContext,
}

pub struct FlowManager {
    entries: Arc<ConfigEntries>,
    handlers: DashMap<String, FlowFactory>,
    flows: DashMap<String, Arc<Mutex<ActiveFlow>>>,
    progress: Arc<DashMap<String, FlowProgress>>,
}

impl FlowManager {
    pub fn new(entries: Arc<ConfigEntries>) -> Self {
        Self {
            entries,
            handlers: DashMap::new(),
            flows: DashMap::new(),
            progress: Arc::new(DashMap::new()),
        }
    }

    pub fn entries(&self) -> &Arc<ConfigEntries> {
        &self.entries
    }

    pub fn register(&self, handler: &str, factory: FlowFactory) {
        self.handlers.insert(handler.to_string(), factory);
        debug!("Registered config flow for {}", handler);
    }

    /// Start a flow for `handler` with its first step
    pub async fn init(&self, handler: &str, step: FlowStep) -> FlowResultOr<FlowResult> {
        let factory = self
            .handlers
            .get(handler)
            .map(|f| f.value().clone())
            .ok_or_else(|| FlowError::UnknownHandler(handler.to_string()))?;

        let flow_id = ulid::Ulid::new().to_string().to_lowercase();
        let source = step.source();
        self.progress.insert(
            flow_id.clone(),
            FlowProgress {
                flow_id: flow_id.clone(),
                handler: handler.to_string(),
                step_id: None,
                source,
                unique_id: None,
            },
        );

        let ctx = FlowContext::new(
            flow_id.clone(),
            handler.to_string(),
            source,
            self.entries.clone(),
            self.progress.clone(),
        );
        let active = ActiveFlow {
            flow: factory(),
            ctx,
        };
        self.flows
            .insert(flow_id.clone(), Arc::new(Mutex::new(active)));

        info!("Started {} config flow {} ({:?})", handler, flow_id, source);
        let result = self.run_step(&flow_id, step).await;
        if let Err(ref err) = result {
            self.forget(&flow_id);
            info!("Config flow {} failed on its first step: {}", flow_id, err);
        }
        result
    }

    /// Submit `user_input` for the form the flow is currently showing
    pub async fn configure(
        &self,
        flow_id: &str,
        user_input: Option<FlowInput>,
    ) -> FlowResultOr<FlowResult> {
        let step_id = self
            .progress
            .get(flow_id)
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?
            .step_id
            .clone()
            .ok_or_else(|| FlowError::NoFormShown(flow_id.to_string()))?;

        self.run_step(flow_id, FlowStep::for_form(&step_id, user_input))
            .await
    }

    async fn run_step(&self, flow_id: &str, step: FlowStep) -> FlowResultOr<FlowResult> {
        let active = self
            .flows
            .get(flow_id)
            .map(|f| f.value().clone())
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))?;

        debug!("Flow {} running step {}", flow_id, step.step_id());

        let mut guard = active.lock().await;
        let ActiveFlow { flow, ctx } = &mut *guard;
        let result = match flow.step(ctx, step).await {
            Ok(result) => result,
            Err(FlowError::Abort(reason)) => FlowResult::abort(reason),
            Err(err) => return Err(err),
        };
        let version = flow.version();
        let handler = ctx.handler().to_string();
        let source = ctx.source();
        let unique_id = ctx.unique_id().map(str::to_string);
        drop(guard);

        match result {
            FlowResult::Form(form) => {
                if let Some(mut progress) = self.progress.get_mut(flow_id) {
                    progress.step_id = Some(form.step_id.clone());
                }
                Ok(FlowResult::Form(form))
            }
            FlowResult::Abort { reason } => {
                self.forget(flow_id);
                info!("Config flow {} aborted: {}", flow_id, reason);
                Ok(FlowResult::Abort { reason })
            }
            FlowResult::CreateEntry { title, data, .. } => {
                self.forget(flow_id);

                let mut entry = ConfigEntry::new(&handler, &title)
                    .with_data(data.clone())
                    .with_source(source)
                    .with_version(version, 1);
                entry.unique_id = unique_id.clone();

                let entry = match self.entries.add(entry).await {
                    Ok(entry) => entry,
                    Err(ConfigEntriesError::AlreadyExists { .. }) => {
                        info!("Config flow {} found its device configured", flow_id);
                        return Ok(FlowResult::abort("already_configured"));
                    }
                    Err(err) => return Err(err.into()),
                };

                if let Some(unique_id) = unique_id {
                    self.abort_siblings(&handler, &unique_id);
                }

                info!(
                    "Config flow {} created entry {} ({})",
                    flow_id, entry.entry_id, title
                );
                Ok(FlowResult::CreateEntry {
                    title,
                    data,
                    version,
                    entry_id: Some(entry.entry_id),
                })
            }
        }
    }

    /// Drop a flow without finishing it
    pub fn abort(&self, flow_id: &str) -> FlowResultOr<()> {
        if self.flows.contains_key(flow_id) {
            self.forget(flow_id);
            info!("Config flow {} aborted by caller", flow_id);
            Ok(())
        } else {
            Err(FlowError::UnknownFlow(flow_id.to_string()))
        }
    }

    /// Flows still waiting for input
    pub fn progress(&self) -> Vec<FlowProgress> {
        self.progress.iter().map(|p| p.value().clone()).collect()
    }

    fn forget(&self, flow_id: &str) {
        self.flows.remove(flow_id);
        self.progress.remove(flow_id);
    }

    /// Other flows of `handler` for a device that now has an entry
    fn abort_siblings(&self, handler: &str, unique_id: &str) {
        let siblings: Vec<String> = self
            .progress
            .iter()
            .filter(|p| p.handler == handler && p.unique_id.as_deref() == Some(unique_id))
            .map(|p| p.flow_id.clone())
            .collect();

        for flow_id in siblings {
            self.forget(&flow_id);
            debug!("Aborted config flow {} for configured {}", flow_id, unique_id);
        }
    }
}
