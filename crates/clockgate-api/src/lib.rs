//! Async client for the HTTPS API exposed by biometric time-clock terminals.
//!
//! Every terminal speaks the same small `*.fcgi` protocol: a credential
//! login that yields a session token, then session-scoped calls that take
//! and return JSON. [`DeviceClient`] issues single calls against one
//! terminal by address; session caching, retries and fleet fan-out live in
//! `clockgate-core`.
//!
//! - [`transport`]: client construction (TLS policy, timeouts, body spooling)
//! - [`client`]: `call()` and the uniform [`DeviceResponse`]
//! - endpoint methods: login/validity, user count/list/mutations, coil paper

pub mod auth;
pub mod client;
pub mod error;
pub mod system;
pub mod transport;
pub mod users;

pub use client::{DeviceClient, DeviceRequest, DeviceResponse};
pub use error::Error;
pub use transport::{Scheme, TransportConfig};
