// Shared transport configuration for building reqwest::Client instances.
//
// Terminals ship self-signed certificates, so the client accepts any
// certificate. Timeouts, scheme, failure logging and body spooling are
// all decided here so the endpoint modules only deal with paths and payloads.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::io::ReaderStream;
use tracing::trace;

use crate::error::Error;

/// Bodies at or above this size are spooled to disk before sending.
pub const DEFAULT_SPOOL_THRESHOLD: usize = 64 * 1024;

/// URL scheme used to reach terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Https,
    /// Plain HTTP, for lab fixtures and mock servers only.
    Http,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Https => "https",
            Self::Http => "http",
        }
    }
}

/// Shared transport configuration for building the device HTTP client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub scheme: Scheme,
    /// Overall deadline for one call, body included.
    pub timeout: Duration,
    /// Deadline for the TCP + TLS handshake.
    pub connect_timeout: Duration,
    /// Log every non-2xx device response at `warn` level.
    pub log_failures: bool,
    /// Bodies of at least this many bytes are streamed from a temp file.
    /// `None` keeps every body in memory.
    pub spool_threshold: Option<usize>,
    /// Directory for spool files. Defaults to the system temp dir.
    pub spool_dir: Option<PathBuf>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            scheme: Scheme::Https,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            log_failures: false,
            spool_threshold: Some(DEFAULT_SPOOL_THRESHOLD),
            spool_dir: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config. Certificate checks are
    /// off: terminals only ship self-signed certificates.
    ///
    /// Fails with [`Error::Configuration`] when the TLS backend can't be
    /// initialised; that failure is fatal, callers must not retry it.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .user_agent(concat!("clockgate/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(true)
            .build().map_err(|e| Error::Configuration {
            message: format!("failed to build HTTP client: {e}"),
        })
    }

    /// Overall timeout in milliseconds, for error reporting.
    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = timeout;
        self
    }
}

// ── Body transfer ───────────────────────────────────────────────────

/// A request body ready to hand to reqwest.
///
/// Large bodies (base64 face photos) are written to a temp file and
/// streamed from there. The file is owned by `_spool` and removed when the
/// `PreparedBody` drops, on every exit path of the call.
pub(crate) struct PreparedBody {
    body: Option<reqwest::Body>,
    pub len: u64,
    _spool: Option<tempfile::TempPath>,
}

impl PreparedBody {
    pub(crate) fn take_body(&mut self) -> Option<reqwest::Body> {
        self.body.take()
    }

    pub(crate) async fn prepare(bytes: Bytes, config: &TransportConfig) -> Result<Self, Error> {
        let len = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        let spool = config
            .spool_threshold
            .is_some_and(|threshold| bytes.len() >= threshold);

        if !spool {
            return Ok(Self {
                body: Some(reqwest::Body::from(bytes)),
                len,
                _spool: None,
            });
        }

        let file = match &config.spool_dir {
            Some(dir) => tempfile::Builder::new()
                .prefix("clockgate_body_")
                .suffix(".json")
                .tempfile_in(dir)?,
            None => tempfile::Builder::new()
                .prefix("clockgate_body_")
                .suffix(".json")
                .tempfile()?,
        };
        let path = file.into_temp_path();
        trace!(path = %path.display(), len, "spooling request body");

        tokio::fs::write(&path, &bytes).await?;
        let reader = tokio::fs::File::open(&path).await?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(reader));

        Ok(Self {
            body: Some(body),
            len,
            _spool: Some(path),
        })
    }
}
