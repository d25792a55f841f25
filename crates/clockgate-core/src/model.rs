// ── Report types ──
//
// Serializable results returned by the gateway facade. Field names are
// camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::normalize::NormalizedUser;
use crate::payload::ListFilter;
use crate::registry::Device;

// ── Actions ──────────────────────────────────────────────────────────

/// One device's outcome within a fan-out action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub device_id: String,
    pub label: String,
    pub address: String,
    pub ok: bool,
    pub attempts: u32,
    pub status_code: Option<u16>,
    pub message: Option<String>,
}

/// How much of the targeted fleet an action reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActionOutcome {
    /// No device applied the change (also the case for an empty device set).
    None,
    Partial,
    Complete,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionSummary {
    pub action: String,
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub results: Vec<ActionResult>,
}

impl ActionSummary {
    /// Aggregate per-device results, keeping their order.
    pub fn new(action: impl Into<String>, results: Vec<ActionResult>) -> Self {
        let total = results.len();
        let success = results.iter().filter(|r| r.ok).count();
        Self {
            action: action.into(),
            generated_at: Utc::now(),
            total,
            success,
            failure: total - success,
            results,
        }
    }

    pub fn outcome(&self) -> ActionOutcome {
        if self.success == 0 {
            ActionOutcome::None
        } else if self.failure == 0 {
            ActionOutcome::Complete
        } else {
            ActionOutcome::Partial
        }
    }
}

// ── Sweeps ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceHealth {
    #[serde(flatten)]
    pub device: Device,
    pub status: HealthStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub online: usize,
    pub data: Vec<DeviceHealth>,
}

impl HealthReport {
    pub fn new(data: Vec<DeviceHealth>) -> Self {
        Self {
            generated_at: Utc::now(),
            total: data.len(),
            online: data
                .iter()
                .filter(|d| d.status == HealthStatus::Online)
                .count(),
            data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReadingStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoilStatus {
    #[serde(flatten)]
    pub device: Device,
    pub status: ReadingStatus,
    pub coil_paper: Option<f64>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoilReport {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub data: Vec<CoilStatus>,
}

// ── Site reads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCountSummary {
    pub site: String,
    pub device_id: String,
    pub address: String,
    pub count: u64,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingMeta {
    pub limit: u64,
    pub offset: u64,
    pub filter: ListFilter,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
    pub site: String,
    pub device_id: String,
    pub address: String,
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub users: Vec<NormalizedUser>,
    pub meta: ListingMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(ok: bool) -> ActionResult {
        ActionResult {
            device_id: "d".into(),
            label: "D".into(),
            address: "10.0.0.1".into(),
            ok,
            attempts: 1,
            status_code: None,
            message: None,
        }
    }

    #[test]
    fn summary_counts_and_outcome() {
        let summary = ActionSummary::new("update-general", vec![result(true), result(false)]);
        assert_eq!((summary.total, summary.success, summary.failure), (2, 1, 1));
        assert_eq!(summary.outcome(), ActionOutcome::Partial);

        assert_eq!(
            ActionSummary::new("x", vec![result(true)]).outcome(),
            ActionOutcome::Complete
        );
        assert_eq!(
            ActionSummary::new("x", vec![result(false)]).outcome(),
            ActionOutcome::None
        );
        assert_eq!(ActionSummary::new("x", Vec::new()).outcome(), ActionOutcome::None);
    }

    #[test]
    fn action_result_serializes_camel_case() {
        let value = serde_json::to_value(result(true)).unwrap_or_default();
        assert_eq!(value["deviceId"], "d");
        assert!(value["statusCode"].is_null());
    }
}
