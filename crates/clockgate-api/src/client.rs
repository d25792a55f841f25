// Device HTTP client
//
// Wraps `reqwest::Client` with terminal-specific URL construction, body
// transfer, and a uniform `{ok, status, text(), json()}` response. Endpoint
// calls (login, users, coil) are inherent methods in sibling modules so this
// file stays focused on transport mechanics.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, preview};
use crate::transport::{PreparedBody, TransportConfig};

// ── Request ──────────────────────────────────────────────────────────

/// One outbound call: method, extra headers, optional opaque body.
#[derive(Debug, Clone)]
pub struct DeviceRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl Default for DeviceRequest {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}

impl DeviceRequest {
    /// `POST` with a JSON-serialized body.
    pub fn post_json(body: &(impl Serialize + ?Sized)) -> Result<Self, Error> {
        let bytes = serde_json::to_vec(body).map_err(|e| Error::Deserialization {
            message: format!("failed to encode request body: {e}"),
            body: String::new(),
        })?;
        Ok(Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(Bytes::from(bytes)),
        })
    }

    /// `POST` with raw bytes, sent as-is.
    pub fn post_bytes(body: impl Into<Bytes>) -> Self {
        Self {
            method: Method::POST,
            headers: HeaderMap::new(),
            body: Some(body.into()),
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────

/// Uniform device response. The body is fully read before the call
/// returns; decoding into text or JSON happens on demand.
#[derive(Debug, Clone)]
pub struct DeviceResponse {
    status: u16,
    body: Bytes,
}

impl DeviceResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// `true` for any status in `[200, 300)`.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Body as UTF-8 text (lossy).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON. An empty body decodes as `{}`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let raw: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &self.body
        };
        serde_json::from_slice(raw).map_err(|e| {
            let body = self.text();
            Error::Deserialization {
                message: format!("device response is not valid JSON: {e}"),
                body,
            }
        })
    }

    /// Turn a non-2xx response into [`Error::Http`] with a short body preview.
    pub fn error_for_status(self) -> Result<Self, Error> {
        if self.ok() {
            Ok(self)
        } else {
            Err(Error::Http {
                status: self.status,
                body: preview(&self.text(), 200),
            })
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// HTTP client for the terminal fleet.
///
/// Cheap to clone: the underlying `reqwest::Client` is reference-counted.
/// One instance serves every device; the target is chosen per call by
/// address.
#[derive(Debug, Clone)]
pub struct DeviceClient {
    http: reqwest::Client,
    config: TransportConfig,
}

impl DeviceClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(config: TransportConfig) -> Result<Self, Error> {
        let http = config.build_client()?;
        Ok(Self { http, config })
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `<scheme>://<address>/<path>`, accepting an embedded query.
    pub fn device_url(&self, address: &str, path: &str) -> Result<Url, Error> {
        let base = Url::parse(&format!("{}://{address}/", self.config.scheme.as_str()))?;
        Ok(base.join(path.trim_start_matches('/'))?)
    }

    /// Build an endpoint URL with properly encoded query pairs, in order.
    pub(crate) fn endpoint_url(
        &self,
        address: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Url, Error> {
        let mut url = self.device_url(address, path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Issue one request to `address` and return the uniform response.
    ///
    /// A non-2xx status is not an error here; the caller inspects
    /// [`DeviceResponse::ok`].
    pub async fn call(
        &self,
        address: &str,
        path: &str,
        request: DeviceRequest,
    ) -> Result<DeviceResponse, Error> {
        let url = self.device_url(address, path)?;
        self.execute(url, request).await
    }

    /// `POST` a JSON body to an endpoint URL.
    pub(crate) async fn post_json(
        &self,
        url: Url,
        body: &(impl Serialize + ?Sized),
    ) -> Result<DeviceResponse, Error> {
        self.execute(url, DeviceRequest::post_json(body)?).await
    }

    pub(crate) async fn execute(
        &self,
        url: Url,
        request: DeviceRequest,
    ) -> Result<DeviceResponse, Error> {
        let timeout_ms = self.config.timeout_ms();
        debug!(method = %request.method, url = %redact(&url), "device request");

        let mut builder = self.http.request(request.method, url.clone());
        if !request.headers.contains_key(CONTENT_TYPE) {
            builder = builder.header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        builder = builder.headers(request.headers);

        // Held until the response body is read; dropping it removes any spool file.
        let mut prepared = match request.body {
            Some(bytes) => Some(PreparedBody::prepare(bytes, &self.config).await?),
            None => None,
        };
        if let Some(prepared) = prepared.as_mut() {
            if let Some(body) = prepared.take_body() {
                builder = builder.header(CONTENT_LENGTH, prepared.len).body(body);
            }
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout_ms))?;
        let status = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::from_reqwest(e, timeout_ms))?;
        drop(prepared);

        let response = DeviceResponse::new(status, body);
        if self.config.log_failures && !response.ok() {
            warn!(
                url = %redact(&url),
                status,
                body = %preview(&response.text(), 200),
                "device call failed"
            );
        }
        Ok(response)
    }
}

/// Strip the session token from a URL before it reaches a log line.
fn redact(url: &Url) -> String {
    if url.query_pairs().any(|(k, _)| k == "session") {
        let mut shown = url.clone();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "session" { "***".into() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        shown.query_pairs_mut().clear().extend_pairs(pairs);
        shown.to_string()
    } else {
        url.to_string()
    }
}
