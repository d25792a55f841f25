//! Configuration for the clockgate gateway.
//!
//! TOML file + `CLOCKGATE_` environment layering, device password
//! resolution (env, keyring, plaintext), and translation into
//! `clockgate_core::GatewayConfig` and `DeviceRegistry`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use clockgate_core::config::DEFAULT_MODE;
use clockgate_core::{
    Device, DeviceCredentials, DeviceRegistry, GatewayConfig, Scheme, TransportConfig,
};

/// Environment variable consulted for the device password when no
/// `password_env` is configured or it is unset.
pub const PASSWORD_ENV: &str = "CLOCKGATE_DEVICE_PASSWORD";

const KEYRING_SERVICE: &str = "clockgate";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no device password configured for login '{login}'")]
    NoCredentials { login: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Tuning shared by every device call.
    #[serde(default)]
    pub defaults: Defaults,

    /// The credential pair every terminal accepts.
    #[serde(default)]
    pub credentials: Credentials,

    /// Per-site settings, keyed by site name.
    #[serde(default)]
    pub sites: BTreeMap<String, SiteConfig>,

    /// The device catalog.
    #[serde(default)]
    pub devices: Vec<Device>,

    /// Addresses included in the coil sweep. Empty means every device.
    #[serde(default)]
    pub coil_monitored: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_session_ttl_ms")]
    pub session_ttl_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Connect-phase timeout. Falls back to `timeout_ms`.
    pub connect_timeout_ms: Option<u64>,

    /// Log every non-2xx device response.
    #[serde(default)]
    pub verbose: bool,

    #[serde(default = "default_mode")]
    pub listing_mode: String,

    #[serde(default = "default_mode")]
    pub mutation_mode: String,

    #[serde(default = "default_spool_threshold")]
    pub spool_threshold_bytes: usize,

    /// Where large request bodies are spooled. System temp dir if unset.
    pub spool_dir: Option<PathBuf>,

    /// "https" (default) or "http" for lab fixtures.
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            session_ttl_ms: default_session_ttl_ms(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: None,
            verbose: false,
            listing_mode: default_mode(),
            mutation_mode: default_mode(),
            spool_threshold_bytes: default_spool_threshold(),
            spool_dir: None,
            scheme: default_scheme(),
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}
fn default_session_ttl_ms() -> u64 {
    60_000
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_mode() -> String {
    DEFAULT_MODE.into()
}
fn default_spool_threshold() -> usize {
    64 * 1024
}
fn default_scheme() -> String {
    "https".into()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Credentials {
    #[serde(default = "default_login")]
    pub login: String,

    /// Plaintext password. Prefer `password_env` or the keyring.
    pub password: Option<String>,

    /// Name of an environment variable holding the password.
    pub password_env: Option<String>,

    /// Consult the system keyring (service `clockgate`).
    #[serde(default = "default_true")]
    pub keyring: bool,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            login: default_login(),
            password: None,
            password_env: None,
            keyring: true,
        }
    }
}

fn default_login() -> String {
    "admin".into()
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SiteConfig {
    /// Address of the terminal that answers count and listing requests.
    pub master: Option<String>,
}

impl Config {
    /// Copy with any plaintext password masked, for display.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.credentials.password.is_some() {
            copy.credentials.password = Some("********".into());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "clockgate", "clockgate").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("clockgate");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` (or the default location) plus
/// `CLOCKGATE_`-prefixed environment variables, `__` separating nesting
/// levels (`CLOCKGATE_DEFAULTS__TIMEOUT_MS=5000`). A missing file is not an
/// error: defaults and environment still apply.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);

    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&path))
        .merge(Env::prefixed("CLOCKGATE_").split("__"));

    Ok(figment.extract()?)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the device password: `password_env`, then
/// `CLOCKGATE_DEVICE_PASSWORD`, then the keyring, then plaintext.
pub fn resolve_password(credentials: &Credentials) -> Result<SecretString, ConfigError> {
    // 1. Named env var
    if let Some(ref env_name) = credentials.password_env {
        if let Ok(value) = std::env::var(env_name) {
            return Ok(SecretString::from(value));
        }
    }

    // 2. Well-known env var
    if let Ok(value) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(value));
    }

    // 3. System keyring
    if credentials.keyring {
        let user = format!("{}/password", credentials.login);
        if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &user) {
            if let Ok(secret) = entry.get_password() {
                return Ok(SecretString::from(secret));
            }
        }
    }

    // 4. Plaintext in config
    if let Some(ref password) = credentials.password {
        return Ok(SecretString::from(password.clone()));
    }

    Err(ConfigError::NoCredentials {
        login: credentials.login.clone(),
    })
}

// ── Translation to core types ───────────────────────────────────────

/// Build the device registry: catalog, site masters, coil selection.
pub fn build_registry(cfg: &Config) -> Result<DeviceRegistry, ConfigError> {
    let mut registry =
        DeviceRegistry::new(cfg.devices.clone()).map_err(|e| invalid("devices", e.to_string()))?;

    for (site, site_cfg) in &cfg.sites {
        if let Some(ref master) = site_cfg.master {
            registry = registry
                .with_master(site, master)
                .map_err(|e| invalid(&format!("sites.{site}.master"), e.to_string()))?;
        }
    }

    if let Some(unknown) = cfg
        .coil_monitored
        .iter()
        .find(|address| registry.by_address(address).is_err())
    {
        return Err(invalid(
            "coil_monitored",
            format!("{unknown} is not a configured device"),
        ));
    }

    Ok(registry.with_coil_monitored(cfg.coil_monitored.clone()))
}

/// Build the runtime gateway configuration, resolving the password.
pub fn to_gateway_config(cfg: &Config) -> Result<GatewayConfig, ConfigError> {
    let defaults = &cfg.defaults;

    if defaults.max_attempts == 0 {
        return Err(invalid("defaults.max_attempts", "must be at least 1"));
    }
    if defaults.timeout_ms == 0 {
        return Err(invalid("defaults.timeout_ms", "must be positive"));
    }
    let scheme = match defaults.scheme.to_ascii_lowercase().as_str() {
        "https" => Scheme::Https,
        "http" => Scheme::Http,
        other => {
            return Err(invalid(
                "defaults.scheme",
                format!("expected 'https' or 'http', got '{other}'"),
            ));
        }
    };

    let timeout = Duration::from_millis(defaults.timeout_ms);
    let connect_timeout = defaults
        .connect_timeout_ms
        .map_or(timeout, Duration::from_millis);

    let password = resolve_password(&cfg.credentials)?;

    Ok(GatewayConfig {
        credentials: DeviceCredentials {
            login: cfg.credentials.login.clone(),
            password,
        },
        max_attempts: defaults.max_attempts,
        session_ttl: Duration::from_millis(defaults.session_ttl_ms),
        transport: TransportConfig {
            scheme,
            timeout,
            connect_timeout,
            log_failures: defaults.verbose,
            spool_threshold: Some(defaults.spool_threshold_bytes),
            spool_dir: defaults.spool_dir.clone(),
        },
        listing_mode: defaults.listing_mode.clone(),
        mutation_mode: defaults.mutation_mode.clone(),
    })
}
