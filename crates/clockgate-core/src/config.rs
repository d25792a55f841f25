// ── Runtime gateway configuration ──
//
// These types describe *how* the gateway talks to the fleet. They carry
// credential data and tuning, but never touch disk: `clockgate-config`
// (or a test) constructs a `GatewayConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;

use clockgate_api::TransportConfig;

/// Default `mode` query value for listing and mode-carrying mutations.
pub const DEFAULT_MODE: &str = "671";

/// The credential pair every terminal in the fleet accepts.
#[derive(Debug, Clone)]
pub struct DeviceCredentials {
    pub login: String,
    pub password: SecretString,
}

impl DeviceCredentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: SecretString::from(password.into()),
        }
    }
}

/// Configuration for a [`Gateway`](crate::Gateway).
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub credentials: DeviceCredentials,
    /// Attempts per device interaction, first try included.
    pub max_attempts: u32,
    /// How long a session token is reused before a fresh login.
    pub session_ttl: Duration,
    /// HTTP client tuning (TLS, timeouts, spooling, failure logging).
    pub transport: TransportConfig,
    /// `mode` sent with `load_users.fcgi`.
    pub listing_mode: String,
    /// `mode` sent with mutation endpoints that take one.
    pub mutation_mode: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            credentials: DeviceCredentials::new("admin", "admin"),
            max_attempts: 2,
            session_ttl: Duration::from_secs(60),
            transport: TransportConfig::default(),
            listing_mode: DEFAULT_MODE.into(),
            mutation_mode: DEFAULT_MODE.into(),
        }
    }
}
