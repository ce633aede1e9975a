//! Config flow for TOLO Sauna
//!
//! ```text
//! user ──(host)──▶ status check ──ok──▶ create entry
//!   ▲                   └─fail─▶ user form, errors.base = cannot_connect
//! dhcp ──▶ unique id / duplicate checks ──▶ status check ──ok──▶ confirm ──▶ create entry
//!                                                └─fail─▶ abort not_tolo_device
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ha_config_entries::{
    ConfigFlow, DhcpServiceInfo, FlowContext, FlowError, FlowFactory, FlowForm, FlowInput,
    FlowResult, FlowResultOr, FlowStep, FormField, CONF_HOST,
};
use ha_util::format_mac;
use serde_json::json;
use tracing::debug;

use super::client::{ToloClientFactory, ToloError};
use super::{DEFAULT_NAME, DOMAIN};
use crate::config::ToloSettings;

pub struct ToloSaunaConfigFlow {
    client_factory: ToloClientFactory,
    settings: ToloSettings,
    discovered_host: Option<String>,
}

impl ToloSaunaConfigFlow {
    pub fn new(client_factory: ToloClientFactory, settings: ToloSettings) -> Self {
        Self {
            client_factory,
            settings,
            discovered_host: None,
        }
    }

    pub fn factory(client_factory: ToloClientFactory, settings: ToloSettings) -> FlowFactory {
        Arc::new(move || {
            Box::new(ToloSaunaConfigFlow::new(
                client_factory.clone(),
                settings.clone(),
            )) as Box<dyn ConfigFlow>
        })
    }

    /// Ask the device for its status on the blocking pool
    ///
    /// A timeout or an empty reply means no sauna answers at `host`.
    async fn check_device_availability(&self, host: &str) -> FlowResultOr<bool> {
        let client = (self.client_factory)(host);
        let resend_timeout = self.settings.retry_timeout();
        let retries = self.settings.retry_count;

        let result =
            tokio::task::spawn_blocking(move || client.get_status_info(resend_timeout, retries))
                .await
                .map_err(|err| FlowError::Handler(format!("status request panicked: {err}")))?;

        match result {
            Ok(status) => Ok(status.is_some()),
            Err(ToloError::ResponseTimedOut) => {
                debug!("No reply from TOLO device at {}", host);
                Ok(false)
            }
            Err(err) => Err(FlowError::Handler(err.to_string())),
        }
    }

    async fn step_user(
        &mut self,
        ctx: &mut FlowContext,
        user_input: Option<FlowInput>,
    ) -> FlowResultOr<FlowResult> {
        let mut form = FlowForm::new("user").field(FormField::required_string(CONF_HOST));

        if let Some(input) = user_input {
            let host = input
                .get(CONF_HOST)
                .and_then(|v| v.as_str())
                .ok_or_else(|| FlowError::Handler(format!("{CONF_HOST} is required")))?
                .to_string();

            ctx.abort_entries_match(&host_data(&host))?;

            if self.check_device_availability(&host).await? {
                return Ok(FlowResult::create_entry(DEFAULT_NAME, host_data(&host)));
            }
            form = form.error("base", "cannot_connect");
        }

        Ok(FlowResult::form(form))
    }

    async fn step_dhcp(
        &mut self,
        ctx: &mut FlowContext,
        discovery_info: DhcpServiceInfo,
    ) -> FlowResultOr<FlowResult> {
        ctx.set_unique_id(format_mac(&discovery_info.macaddress))
            .await?;
        ctx.abort_if_unique_id_configured(Some(host_data(&discovery_info.ip)))
            .await?;
        ctx.abort_entries_match(&host_data(&discovery_info.ip))?;

        if self.check_device_availability(&discovery_info.ip).await? {
            self.discovered_host = Some(discovery_info.ip);
            return self.step_confirm(ctx, None).await;
        }
        Ok(FlowResult::abort("not_tolo_device"))
    }

    async fn step_confirm(
        &mut self,
        ctx: &mut FlowContext,
        user_input: Option<FlowInput>,
    ) -> FlowResultOr<FlowResult> {
        let host = self
            .discovered_host
            .clone()
            .ok_or_else(|| FlowError::UnknownStep("confirm".to_string()))?;

        if user_input.is_some() {
            ctx.abort_entries_match(&host_data(&host))?;
            return Ok(FlowResult::create_entry(DEFAULT_NAME, host_data(&host)));
        }

        Ok(FlowResult::form(
            FlowForm::new("confirm").placeholder(CONF_HOST, host),
        ))
    }
}

fn host_data(host: &str) -> FlowInput {
    HashMap::from([(CONF_HOST.to_string(), json!(host))])
}

#[async_trait]
impl ConfigFlow for ToloSaunaConfigFlow {
    fn domain(&self) -> &'static str {
        DOMAIN
    }

    async fn step(&mut self, ctx: &mut FlowContext, step: FlowStep) -> FlowResultOr<FlowResult> {
        match step {
            FlowStep::User(user_input) => self.step_user(ctx, user_input).await,
            FlowStep::Dhcp(discovery_info) => self.step_dhcp(ctx, discovery_info).await,
            FlowStep::Submit {
                step_id,
                user_input,
            } if step_id == "confirm" => self.step_confirm(ctx, user_input).await,
            FlowStep::Submit { step_id, .. } => Err(FlowError::UnknownStep(step_id)),
        }
    }
}
