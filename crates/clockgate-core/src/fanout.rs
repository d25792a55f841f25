// ── Fleet fan-out ──
//
// Mutations run device by device, in registry order, each through the
// retry executor. Read-only sweeps run concurrently but are gathered back
// into input order.

use std::future::Future;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use clockgate_api::{DeviceClient, DeviceResponse};

use crate::error::CoreError;
use crate::model::{ActionResult, ActionSummary};
use crate::normalize::{coerce_f64, coerce_string};
use crate::registry::Device;
use crate::retry::RetryExecutor;
use crate::session::Purpose;

const REJECTED_FALLBACK: &str = "device rejected the request";

/// The five state-changing user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum UserAction {
    UpdateGeneral,
    UpdatePhoto,
    RemovePhoto,
    RemoveUser,
    AddUser,
}

impl UserAction {
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::UpdateGeneral | Self::UpdatePhoto | Self::RemovePhoto => "update_users.fcgi",
            Self::RemoveUser => "remove_users.fcgi",
            Self::AddUser => "add_users.fcgi",
        }
    }

    pub fn sends_mode(self) -> bool {
        !matches!(self, Self::RemoveUser)
    }

    pub fn success_message(self) -> &'static str {
        match self {
            Self::UpdateGeneral => "Updated successfully",
            Self::UpdatePhoto => "Photo updated successfully",
            Self::RemovePhoto => "Photo removed successfully",
            Self::RemoveUser => "User removed successfully",
            Self::AddUser => "User created successfully",
        }
    }

    /// Build the wire body for this action from caller input.
    pub fn build_payload(self, data: &Value) -> Result<Value, CoreError> {
        match self {
            Self::UpdateGeneral => crate::payload::build_general_update(data),
            Self::UpdatePhoto => crate::payload::build_photo_update(data),
            Self::RemovePhoto => crate::payload::build_photo_removal(data),
            Self::RemoveUser => crate::payload::build_user_deletion(data),
            Self::AddUser => crate::payload::build_user_creation(data),
        }
    }

    /// Endpoint settings for this action, using `mode` where one is sent.
    pub fn endpoint_config(self, mode: &str) -> EndpointConfig {
        EndpointConfig {
            path: self.endpoint().to_owned(),
            mode: self.sends_mode().then(|| mode.to_owned()),
            success_message: self.success_message().to_owned(),
        }
    }
}

/// Where and how a mutation is posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub path: String,
    /// Appended as `mode=<value>` after the session when present.
    pub mode: Option<String>,
    pub success_message: String,
}

#[derive(Debug, Clone)]
pub struct FanOutExecutor {
    client: DeviceClient,
    retry: RetryExecutor,
}

impl FanOutExecutor {
    pub fn new(client: DeviceClient, retry: RetryExecutor) -> Self {
        Self { client, retry }
    }

    /// Post `payload` to every device in `devices`, one at a time.
    ///
    /// A device that exhausts its attempts is recorded and the run moves on.
    pub async fn run(
        &self,
        action: &str,
        devices: &[Device],
        payload: &Value,
        endpoint: &EndpointConfig,
    ) -> ActionSummary {
        let mut results = Vec::with_capacity(devices.len());
        for device in devices {
            results.push(self.apply(device, payload, endpoint).await);
        }

        let summary = ActionSummary::new(action, results);
        info!(
            action,
            total = summary.total,
            success = summary.success,
            failure = summary.failure,
            "fan-out complete"
        );
        summary
    }

    async fn apply(
        &self,
        device: &Device,
        payload: &Value,
        endpoint: &EndpointConfig,
    ) -> ActionResult {
        let attempted = self
            .retry
            .run(Purpose::Mutation, device, |session| async move {
                let response = self
                    .client
                    .mutate_users(
                        &device.address,
                        &session,
                        &endpoint.path,
                        endpoint.mode.as_deref(),
                        payload,
                    )
                    .await?;
                let message = interpret_mutation(&response, &endpoint.success_message)?;
                Ok::<_, CoreError>((response.status(), message))
            })
            .await;

        let (ok, status_code, message) = match attempted.result {
            Ok((status, message)) => (true, Some(status), message),
            Err(err) => (false, err.status(), err.to_string()),
        };
        ActionResult {
            device_id: device.id.clone(),
            label: device.label.clone(),
            address: device.address.clone(),
            ok,
            attempts: attempted.attempts,
            status_code,
            message: Some(message),
        }
    }
}

/// Read a 2xx mutation body: a numeric `success` of 0 is a rejection, a
/// `message` replaces the default text. Non-JSON bodies count as success.
fn interpret_mutation(
    response: &DeviceResponse,
    default_message: &str,
) -> Result<String, CoreError> {
    let Ok(body) = response.json::<Value>() else {
        return Ok(default_message.to_owned());
    };
    let message = body.get("message").and_then(coerce_string);

    let rejected = body
        .get("success")
        .and_then(coerce_f64)
        .is_some_and(|flag| flag == 0.0);
    if rejected {
        return Err(CoreError::Rejected {
            message: message.unwrap_or_else(|| REJECTED_FALLBACK.to_owned()),
            status: response.status(),
        });
    }

    Ok(message.unwrap_or_else(|| default_message.to_owned()))
}

/// Run `probe` against every device concurrently; results come back in
/// `devices` order.
pub async fn sweep<'a, T, F, Fut>(devices: &'a [Device], probe: F) -> Vec<T>
where
    F: Fn(&'a Device) -> Fut,
    Fut: Future<Output = T>,
{
    join_all(devices.iter().map(probe)).await
}
