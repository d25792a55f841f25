use thiserror::Error;

/// Top-level error type for the `clockgate-api` crate.
///
/// Covers every failure a single device call can produce: client
/// construction, transport, HTTP status, login, and payload decoding.
/// `clockgate-core` folds these into its failure taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// The HTTP client could not be constructed (TLS backend, bad options).
    /// Never worth retrying.
    #[error("Transport unavailable: {message}")]
    Configuration { message: String },

    /// URL parsing error (usually a malformed device address).
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, reset, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Request or connect phase exceeded its deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Writing a request body to its spool file failed.
    #[error("Failed to spool request body: {0}")]
    Spool(#[from] std::io::Error),

    // ── Protocol ────────────────────────────────────────────────────
    /// Device answered with a status outside `[200, 300)`.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Login was refused or returned no session token. `status` is set
    /// when the device answered outside `[200, 300)`.
    #[error("Login failed: {message}")]
    Login { message: String, status: Option<u16> },

    /// Response body was not the JSON shape we needed, with the raw body
    /// kept for debugging.
    #[error("Invalid device response: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Classify a `reqwest` failure, surfacing deadline hits as [`Error::Timeout`].
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else if err.is_builder() {
            Self::Configuration {
                message: err.to_string(),
            }
        } else {
            Self::Transport(err)
        }
    }

    /// HTTP status attached to the failure, if the device answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Login { status, .. } => *status,
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// First `max` characters of a body, for error messages and logs.
pub(crate) fn preview(body: &str, max: usize) -> String {
    body.chars().take(max).collect()
}
