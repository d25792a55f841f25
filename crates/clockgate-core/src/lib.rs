//! Fleet gateway for biometric time-clock terminals.
//!
//! Sits between an operator console and the terminals' `*.fcgi` API:
//!
//! - [`SessionManager`]: per-(purpose, device) session cache with TTL and
//!   single-flight login
//! - [`RetryExecutor`]: bounded retry that invalidates the session after
//!   every failure
//! - [`FanOutExecutor`]: sequential mutation fan-out with per-device results
//! - [`normalize`]: canonical user and coil records from firmware-specific JSON
//! - [`payload`]: caller input to wire bodies, with validation
//! - [`Gateway`]: the per-site operations built from the above

pub mod config;
pub mod error;
pub mod fanout;
pub mod gateway;
pub mod model;
pub mod normalize;
pub mod payload;
pub mod registry;
pub mod retry;
pub mod session;

pub use config::{DeviceCredentials, GatewayConfig};
pub use error::CoreError;
pub use fanout::{EndpointConfig, FanOutExecutor, UserAction};
pub use gateway::Gateway;
pub use model::{
    ActionOutcome, ActionResult, ActionSummary, CoilReport, CoilStatus, DeviceHealth,
    HealthReport, HealthStatus, ListingMeta, ReadingStatus, UserCountSummary, UserListing,
};
pub use normalize::{NormalizedUser, extract_coil_reading, normalize_users};
pub use payload::{ListFilter, ListQuery};
pub use registry::{Device, DeviceRegistry};
pub use retry::{Attempted, RetryExecutor};
pub use session::{Purpose, SessionManager, SessionStats};

// Transport types callers need to build a `GatewayConfig`.
pub use clockgate_api::{Scheme, TransportConfig};
