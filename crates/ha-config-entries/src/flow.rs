//! Config flow framework
//!
//! A config flow is a step-based wizard that ends in a new config entry or an
//! abort. Each call to [`ConfigFlow::step`] receives one [`FlowStep`] and
//! answers with one [`FlowResult`]: show a form, create an entry, or abort.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::discovery::DhcpServiceInfo;
use crate::entry::{ConfigEntry, ConfigEntrySource, ConfigEntryState, ConfigEntryUpdate};
use crate::manager::{ConfigEntries, ConfigEntriesError};

/// Values submitted for a form, keyed by field name
pub type FlowInput = HashMap<String, serde_json::Value>;

/// Input driving a flow forward
#[derive(Debug, Clone, PartialEq)]
pub enum FlowStep {
    /// Flow started by a user, or the user form submitted
    User(Option<FlowInput>),
    /// Flow started by DHCP discovery
    Dhcp(DhcpServiceInfo),
    /// A form other than `user` submitted (or shown again with `None`)
    Submit {
        step_id: String,
        user_input: Option<FlowInput>,
    },
}

impl FlowStep {
    /// Step answering the form `step_id`
    pub fn for_form(step_id: &str, user_input: Option<FlowInput>) -> Self {
        match step_id {
            "user" => FlowStep::User(user_input),
            _ => FlowStep::Submit {
                step_id: step_id.to_string(),
                user_input,
            },
        }
    }

    pub fn step_id(&self) -> &str {
        match self {
            FlowStep::User(_) => "user",
            FlowStep::Dhcp(_) => "dhcp",
            FlowStep::Submit { step_id, .. } => step_id,
        }
    }

    /// Source recorded on entries created by a flow started with this step
    pub fn source(&self) -> ConfigEntrySource {
        match self {
            FlowStep::Dhcp(_) => ConfigEntrySource::Dhcp,
            FlowStep::User(_) | FlowStep::Submit { .. } => ConfigEntrySource::User,
        }
    }
}

/// Form field schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl FormField {
    pub fn required_string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: "string".to_string(),
            required: Some(true),
            default: None,
        }
    }

    pub fn with_default(mut self, default: serde_json::Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A form shown to the user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowForm {
    pub step_id: String,
    /// Always present, empty if the form has no fields
    pub data_schema: Vec<FormField>,
    /// Errors from the previous submission, keyed by field or `base`
    pub errors: HashMap<String, String>,
    pub description_placeholders: HashMap<String, String>,
}

impl FlowForm {
    pub fn new(step_id: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            ..Default::default()
        }
    }

    pub fn field(mut self, field: FormField) -> Self {
        self.data_schema.push(field);
        self
    }

    pub fn error(mut self, key: impl Into<String>, error: impl Into<String>) -> Self {
        self.errors.insert(key.into(), error.into());
        self
    }

    pub fn placeholder(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.description_placeholders
            .insert(key.into(), value.into());
        self
    }
}

/// Outcome of a single flow step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowResult {
    Form(FlowForm),
    CreateEntry {
        title: String,
        data: FlowInput,
        version: u32,
        /// Filled in by the flow manager once the entry is stored
        #[serde(default, skip_serializing_if = "Option::is_none")]
        entry_id: Option<String>,
    },
    Abort {
        reason: String,
    },
}

impl FlowResult {
    pub fn form(form: FlowForm) -> Self {
        FlowResult::Form(form)
    }

    pub fn create_entry(title: impl Into<String>, data: FlowInput) -> Self {
        FlowResult::CreateEntry {
            title: title.into(),
            data,
            version: 1,
            entry_id: None,
        }
    }

    pub fn abort(reason: impl Into<String>) -> Self {
        FlowResult::Abort {
            reason: reason.into(),
        }
    }

    pub fn as_form(&self) -> Option<&FlowForm> {
        match self {
            FlowResult::Form(form) => Some(form),
            _ => None,
        }
    }

    pub fn abort_reason(&self) -> Option<&str> {
        match self {
            FlowResult::Abort { reason } => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Unknown flow handler: {0}")]
    UnknownHandler(String),

    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    #[error("Handler does not support step {0}")]
    UnknownStep(String),

    #[error("Flow {0} is not showing a form")]
    NoFormShown(String),

    /// Ends the flow with `FlowResult::Abort { reason }`
    #[error("Flow aborted: {0}")]
    Abort(String),

    #[error(transparent)]
    Entries(#[from] ConfigEntriesError),

    #[error("Flow handler error: {0}")]
    Handler(String),
}

pub type FlowResultOr<T> = Result<T, FlowError>;

/// An integration's config flow
#[async_trait]
pub trait ConfigFlow: Send {
    /// Integration domain this flow creates entries for
    fn domain(&self) -> &'static str;

    /// Version stamped on created entries
    fn version(&self) -> u32 {
        1
    }

    async fn step(&mut self, ctx: &mut FlowContext, step: FlowStep) -> FlowResultOr<FlowResult>;
}

/// In-progress flow as listed by [`crate::FlowManager::progress`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowProgress {
    pub flow_id: String,
    pub handler: String,
    /// Step of the form currently shown, if any
    pub step_id: Option<String>,
    pub source: ConfigEntrySource,
    pub unique_id: Option<String>,
}

/// What a flow can see and do beyond its own state
pub struct FlowContext {
    flow_id: String,
    handler: String,
    source: ConfigEntrySource,
    unique_id: Option<String>,
    entries: Arc<ConfigEntries>,
    progress: Arc<DashMap<String, FlowProgress>>,
}

impl FlowContext {
    pub(crate) fn new(
        flow_id: String,
        handler: String,
        source: ConfigEntrySource,
        entries: Arc<ConfigEntries>,
        progress: Arc<DashMap<String, FlowProgress>>,
    ) -> Self {
        Self {
            flow_id,
            handler,
            source,
            unique_id: None,
            entries,
            progress,
        }
    }

    pub fn flow_id(&self) -> &str {
        &self.flow_id
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn source(&self) -> ConfigEntrySource {
        self.source
    }

    pub fn unique_id(&self) -> Option<&str> {
        self.unique_id.as_deref()
    }

    pub fn entries(&self) -> &ConfigEntries {
        &self.entries
    }

    /// Claim `unique_id` for this flow
    ///
    /// Aborts with `already_in_progress` when another flow of the same
    /// handler already holds it. Returns the configured entry with that id,
    /// if there is one.
    pub async fn set_unique_id(
        &mut self,
        unique_id: impl Into<String>,
    ) -> FlowResultOr<Option<ConfigEntry>> {
        let unique_id = unique_id.into();

        let in_progress = self.progress.iter().any(|p| {
            p.flow_id != self.flow_id
                && p.handler == self.handler
                && p.unique_id.as_deref() == Some(unique_id.as_str())
        });
        if in_progress {
            return Err(FlowError::Abort("already_in_progress".to_string()));
        }

        if let Some(mut progress) = self.progress.get_mut(&self.flow_id) {
            progress.unique_id = Some(unique_id.clone());
        }
        debug!("Flow {} claimed unique id {}", self.flow_id, unique_id);

        let existing = self.entries.get_by_unique_id(&self.handler, &unique_id);
        self.unique_id = Some(unique_id);
        Ok(existing)
    }

    /// Abort with `already_configured` if an entry holds this flow's unique id
    ///
    /// `updates` are merged into that entry's data first; a changed entry is
    /// saved and reloaded when it is loaded or waiting to retry setup.
    pub async fn abort_if_unique_id_configured(
        &self,
        updates: Option<FlowInput>,
    ) -> FlowResultOr<()> {
        let Some(unique_id) = self.unique_id.as_deref() else {
            return Ok(());
        };
        let Some(entry) = self.entries.get_by_unique_id(&self.handler, unique_id) else {
            return Ok(());
        };

        if let Some(updates) = updates {
            let mut data = entry.data.clone();
            data.extend(updates);
            if data != entry.data {
                let updated = self
                    .entries
                    .update(&entry.entry_id, ConfigEntryUpdate::new().data(data))
                    .await?;
                let reload = matches!(
                    updated.state,
                    ConfigEntryState::Loaded | ConfigEntryState::SetupRetry
                );
                if reload {
                    if let Err(err) = self.entries.reload(&updated.entry_id).await {
                        warn!("Reload of {} after update failed: {}", updated.entry_id, err);
                    }
                }
            }
        }

        Err(FlowError::Abort("already_configured".to_string()))
    }

    /// Abort with `already_configured` if an entry's data contains `matcher`
    pub fn abort_entries_match(&self, matcher: &FlowInput) -> FlowResultOr<()> {
        if self.entries.entries_match(&self.handler, matcher).is_empty() {
            Ok(())
        } else {
            Err(FlowError::Abort("already_configured".to_string()))
        }
    }
}
