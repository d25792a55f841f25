//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use clockgate_config::ConfigError;
use clockgate_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const UNAVAILABLE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Terminal unreachable: {message}")]
    #[diagnostic(
        code(clockgate::connection_failed),
        help("Check that the terminal is powered on and reachable from this host.")
    )]
    ConnectionFailed { message: String },

    #[error("HTTP client unavailable: {message}")]
    #[diagnostic(
        code(clockgate::transport_unavailable),
        help("The TLS backend could not be initialised. Check the system TLS libraries.")
    )]
    TransportUnavailable { message: String },

    #[error("Terminal did not answer in time: {message}")]
    #[diagnostic(
        code(clockgate::timeout),
        help("Raise defaults.timeout_ms in the config, or pass --timeout-ms.")
    )]
    Timeout { message: String },

    // ── Device responses ─────────────────────────────────────────────
    #[error("Terminal error: {message}")]
    #[diagnostic(code(clockgate::device_error))]
    Device { message: String },

    #[error("Terminal rejected the request: {message}")]
    #[diagnostic(code(clockgate::rejected))]
    Rejected { message: String },

    // ── Fan-out outcome ──────────────────────────────────────────────
    #[error("{action}: {failure} of {total} terminals failed")]
    #[diagnostic(
        code(clockgate::partially_applied),
        help("The fleet is out of sync. Fix the failing terminals and re-run the same command.")
    )]
    PartiallyApplied {
        action: String,
        failure: usize,
        total: usize,
    },

    #[error("{action}: no terminal applied the change")]
    #[diagnostic(code(clockgate::nothing_applied))]
    NothingApplied { action: String },

    // ── Credentials ──────────────────────────────────────────────────
    #[error("No device password configured for login '{login}'")]
    #[diagnostic(
        code(clockgate::no_credentials),
        help(
            "Set CLOCKGATE_DEVICE_PASSWORD, point credentials.password_env at a variable,\n\
             or store it in the system keyring (service 'clockgate', user '{login}/password')."
        )
    )]
    NoCredentials { login: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No terminals configured")]
    #[diagnostic(
        code(clockgate::no_devices),
        help("Add [[devices]] entries to {path}\nOr pass --config <PATH>.")
    )]
    NoDevices { path: String },

    #[error("{message}")]
    #[diagnostic(
        code(clockgate::configuration),
        help("Run: clockgate devices   to see configured sites and terminals")
    )]
    Configuration { message: String },

    #[error(transparent)]
    #[diagnostic(code(clockgate::config))]
    Config(ConfigError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(clockgate::validation))]
    Validation { field: String, reason: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(clockgate::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::TransportUnavailable { .. } => exit_code::UNAVAILABLE,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Configuration { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Configuration { message } => CliError::Configuration { message },
            CoreError::TransportUnavailable { message } => {
                CliError::TransportUnavailable { message }
            }
            CoreError::Validation { message } => CliError::Validation {
                field: "payload".into(),
                reason: message,
            },
            CoreError::Transport {
                message,
                timed_out: true,
            } => CliError::Timeout { message },
            CoreError::Transport { message, .. } => CliError::ConnectionFailed { message },
            CoreError::Protocol { message, .. } => CliError::Device { message },
            CoreError::Rejected { message, .. } => CliError::Rejected { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { login } => CliError::NoCredentials { login },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
