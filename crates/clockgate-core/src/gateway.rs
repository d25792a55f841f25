// ── Gateway facade ──
//
// The operations the operator console consumes: per-site health sweeps,
// user count and listing from the site master, fleet-wide coil readings,
// and the five user mutations fanned out across a site.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use clockgate_api::DeviceClient;

use crate::config::GatewayConfig;
use crate::error::CoreError;
use crate::fanout::{FanOutExecutor, UserAction, sweep};
use crate::model::{
    ActionSummary, CoilReport, CoilStatus, DeviceHealth, HealthReport, HealthStatus, ListingMeta,
    ReadingStatus, UserCountSummary, UserListing,
};
use crate::normalize::{extract_coil_reading, normalize_users};
use crate::payload::ListQuery;
use crate::registry::{Device, DeviceRegistry};
use crate::retry::RetryExecutor;
use crate::session::{Purpose, SessionManager};

/// Entry point to the device fleet. Cheap to share behind an `Arc`.
#[derive(Debug)]
pub struct Gateway {
    config: GatewayConfig,
    registry: Arc<DeviceRegistry>,
    client: DeviceClient,
    sessions: SessionManager,
    retry: RetryExecutor,
    fanout: FanOutExecutor,
}

impl Gateway {
    /// Build the HTTP client from `config.transport` and wire up the
    /// session cache, retry policy and fan-out executor.
    pub fn new(config: GatewayConfig, registry: DeviceRegistry) -> Result<Self, CoreError> {
        let client = DeviceClient::new(config.transport.clone())?;
        let sessions = SessionManager::new(
            client.clone(),
            config.credentials.clone(),
            config.session_ttl,
        );
        let retry = RetryExecutor::new(sessions.clone(), config.max_attempts);
        let fanout = FanOutExecutor::new(client.clone(), retry.clone());
        Ok(Self {
            config,
            registry: Arc::new(registry),
            client,
            sessions,
            retry,
            fanout,
        })
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    // ── Health ───────────────────────────────────────────────────────

    /// Probe every device of `site` (or the whole fleet) concurrently.
    pub async fn health_sweep(&self, site: Option<&str>) -> Result<HealthReport, CoreError> {
        let devices = match site {
            Some(site) => self.registry.site_devices(site)?,
            None => self.registry.devices().to_vec(),
        };
        let data = sweep(&devices, |device| self.probe_health(device)).await;
        let report = HealthReport::new(data);
        info!(total = report.total, online = report.online, "health sweep complete");
        Ok(report)
    }

    async fn probe_health(&self, device: &Device) -> DeviceHealth {
        let client = &self.client;
        // Any 2xx means alive; firmware disagrees on the validity payload.
        let attempted = self
            .retry
            .run(Purpose::HealthCheck, device, |session| async move {
                client
                    .session_is_valid(&device.address, &session)
                    .await
                    .map_err(CoreError::from)
            })
            .await;

        let (status, last_error) = match attempted.result {
            Ok(()) => (HealthStatus::Online, None),
            Err(err) => (HealthStatus::Offline, Some(err.to_string())),
        };
        DeviceHealth {
            device: device.clone(),
            status,
            attempts: attempted.attempts,
            last_error,
        }
    }

    // ── Site reads ───────────────────────────────────────────────────

    /// Registered user count, read from the site master.
    pub async fn user_count(&self, site: &str) -> Result<UserCountSummary, CoreError> {
        let device = self.registry.site_master(site)?;
        let client = &self.client;
        let count = self
            .retry
            .run(Purpose::UserCount, device, |session| async move {
                client
                    .count_users(&device.address, &session)
                    .await
                    .map_err(CoreError::from)
            })
            .await
            .result?;

        Ok(UserCountSummary {
            site: device.site.clone(),
            device_id: device.id.clone(),
            address: device.address.clone(),
            count,
            generated_at: Utc::now(),
        })
    }

    /// One page of users (or the users matching a CPF filter), normalized.
    pub async fn list_users(
        &self,
        site: &str,
        query: &ListQuery,
    ) -> Result<UserListing, CoreError> {
        let device = self.registry.site_master(site)?;
        let client = &self.client;
        let mode = self.config.listing_mode.as_str();
        let body = &query.request_body();
        debug!(site, device = %device.id, filter = %query.filter(), "listing users");

        let payload = self
            .retry
            .run(Purpose::UserListing, device, |session| async move {
                client
                    .load_users(&device.address, &session, mode, body)
                    .await
                    .map_err(CoreError::from)
            })
            .await
            .result?;

        let users = normalize_users(&payload);
        Ok(UserListing {
            site: device.site.clone(),
            device_id: device.id.clone(),
            address: device.address.clone(),
            generated_at: Utc::now(),
            count: users.len(),
            users,
            meta: ListingMeta {
                limit: query.limit,
                offset: query.offset,
                filter: query.filter(),
            },
        })
    }

    // ── Coil paper ───────────────────────────────────────────────────

    /// Read remaining paper from every coil-monitored device concurrently.
    pub async fn coil_sweep(&self) -> CoilReport {
        let devices = self.registry.coil_monitored();
        let data = sweep(&devices, |device| self.read_coil(device)).await;
        CoilReport {
            generated_at: Utc::now(),
            total: data.len(),
            data,
        }
    }

    async fn read_coil(&self, device: &Device) -> CoilStatus {
        let client = &self.client;
        let attempted = self
            .retry
            .run(Purpose::CoilReading, device, |session| async move {
                let payload = client.coil_paper(&device.address, &session).await?;
                extract_coil_reading(&payload)
            })
            .await;

        let (status, coil_paper, last_error) = match attempted.result {
            Ok(reading) => (ReadingStatus::Success, Some(reading), None),
            Err(err) => (ReadingStatus::Error, None, Some(err.to_string())),
        };
        CoilStatus {
            device: device.clone(),
            status,
            coil_paper,
            attempts: attempted.attempts,
            last_error,
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Validate `data`, build the action's wire body and apply it to every
    /// device of `site` in registry order.
    pub async fn run_action(
        &self,
        site: &str,
        action: UserAction,
        data: &Value,
    ) -> Result<ActionSummary, CoreError> {
        let payload = action.build_payload(data)?;
        let devices = self.registry.site_devices(site)?;
        let endpoint = action.endpoint_config(&self.config.mutation_mode);
        debug!(site, %action, devices = devices.len(), "starting fan-out");
        Ok(self
            .fanout
            .run(&action.to_string(), &devices, &payload, &endpoint)
            .await)
    }

    pub async fn update_user(&self, site: &str, data: &Value) -> Result<ActionSummary, CoreError> {
        self.run_action(site, UserAction::UpdateGeneral, data).await
    }

    pub async fn add_user(&self, site: &str, data: &Value) -> Result<ActionSummary, CoreError> {
        self.run_action(site, UserAction::AddUser, data).await
    }

    pub async fn update_photo(&self, site: &str, data: &Value) -> Result<ActionSummary, CoreError> {
        self.run_action(site, UserAction::UpdatePhoto, data).await
    }

    pub async fn remove_photo(&self, site: &str, data: &Value) -> Result<ActionSummary, CoreError> {
        self.run_action(site, UserAction::RemovePhoto, data).await
    }

    pub async fn remove_user(&self, site: &str, data: &Value) -> Result<ActionSummary, CoreError> {
        self.run_action(site, UserAction::RemoveUser, data).await
    }
}
