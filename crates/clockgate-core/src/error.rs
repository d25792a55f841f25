// ── Core error types ──
//
// The gateway's failure taxonomy. Transport-layer errors from
// `clockgate_api` are folded into classes that decide retry behaviour.
// Configuration, validation and missing-transport failures surface at once;
// transport, protocol and rejection failures feed the retry loop.
//
// Every variant carries plain data so the type is `Clone`: one failed
// login is handed to every caller that was waiting on it.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Fatal ────────────────────────────────────────────────────────
    /// Unconfigured device or site, or a malformed device address.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The HTTP client could not be built or could not issue the request.
    #[error("{message}")]
    TransportUnavailable { message: String },

    /// Caller payload is missing or has malformed required fields.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Retryable ────────────────────────────────────────────────────
    /// Connection failure, timeout, or local body-transfer failure.
    #[error("{message}")]
    Transport { message: String, timed_out: bool },

    /// Non-2xx status, undecodable payload, or refused login.
    #[error("{message}")]
    Protocol { message: String, status: Option<u16> },

    /// The device answered 2xx but flagged the request as unsuccessful.
    #[error("{message}")]
    Rejected { message: String, status: u16 },
}

impl CoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
            status: None,
        }
    }

    /// `true` for failures the retry loop may try again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Protocol { .. } | Self::Rejected { .. }
        )
    }

    /// HTTP status of the device response behind this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Protocol { status, .. } => *status,
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<clockgate_api::Error> for CoreError {
    fn from(err: clockgate_api::Error) -> Self {
        use clockgate_api::Error as ApiError;

        let message = err.to_string();
        match err {
            ApiError::Configuration { .. } => CoreError::TransportUnavailable { message },
            ApiError::InvalidUrl(_) => CoreError::Configuration { message },
            ApiError::Timeout { .. } => CoreError::Transport {
                message,
                timed_out: true,
            },
            ApiError::Transport(_) | ApiError::Spool(_) => CoreError::Transport {
                message,
                timed_out: false,
            },
            ApiError::Http { status, .. } => CoreError::Protocol {
                message,
                status: Some(status),
            },
            ApiError::Login { status, .. } => CoreError::Protocol { message, status },
            ApiError::Deserialization { .. } => CoreError::Protocol {
                message,
                status: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_are_classified() {
        let err: CoreError = clockgate_api::Error::Http {
            status: 503,
            body: "busy".into(),
        }
        .into();
        assert_eq!(err.status(), Some(503));
        assert!(err.is_retryable());
        assert_eq!(err.to_string(), "HTTP 503: busy");

        let err: CoreError = clockgate_api::Error::Timeout { timeout_ms: 10 }.into();
        assert!(matches!(err, CoreError::Transport { timed_out: true, .. }));

        let err: CoreError = clockgate_api::Error::Configuration {
            message: "no tls".into(),
        }
        .into();
        assert!(matches!(err, CoreError::TransportUnavailable { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn refused_login_keeps_its_status() {
        let err: CoreError = clockgate_api::Error::Login {
            message: "login failed (HTTP 401): denied".into(),
            status: Some(401),
        }
        .into();
        assert_eq!(err.status(), Some(401));
        assert!(err.is_retryable());

        let err: CoreError = clockgate_api::Error::Login {
            message: "login response carried no session".into(),
            status: None,
        }
        .into();
        assert_eq!(err.status(), None);
    }

    #[test]
    fn validation_is_never_retried() {
        assert!(!CoreError::validation("CPF is required").is_retryable());
        let rejected = CoreError::Rejected {
            message: "no".into(),
            status: 200,
        };
        assert!(rejected.is_retryable());
        assert_eq!(rejected.status(), Some(200));
    }
}
