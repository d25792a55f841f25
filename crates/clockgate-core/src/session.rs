// ── Session cache ──
//
// One session token per (purpose, device). Tokens are reused until their
// TTL lapses or a failed call invalidates them. Concurrent requests for the
// same key share a single in-flight login: the first caller creates a
// `Shared` login future and parks it in `pending`, later callers clone and
// await it. Different purposes never share a token, so a listing session
// being invalidated cannot disturb a mutation in progress on the same device.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use clockgate_api::DeviceClient;

use crate::config::DeviceCredentials;
use crate::error::CoreError;
use crate::registry::Device;

type LoginFuture = Shared<BoxFuture<'static, Result<String, CoreError>>>;

/// Independent session pools kept per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(strum::Display, strum::EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Purpose {
    HealthCheck,
    UserCount,
    UserListing,
    CoilReading,
    Mutation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    purpose: Purpose,
    device_id: String,
}

impl SessionKey {
    fn new(purpose: Purpose, device: &Device) -> Self {
        Self {
            purpose,
            device_id: device.id.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedSession {
    token: String,
    expires_at: Instant,
}

/// Login and invalidation counters, mostly for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub logins: u64,
    pub invalidations: u64,
    pub cached: usize,
}

struct SessionInner {
    client: DeviceClient,
    credentials: DeviceCredentials,
    ttl: Duration,
    sessions: DashMap<SessionKey, CachedSession>,
    pending: DashMap<SessionKey, LoginFuture>,
    logins: AtomicU64,
    invalidations: AtomicU64,
}

/// Shared, cheaply clonable session cache.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

impl SessionManager {
    pub fn new(client: DeviceClient, credentials: DeviceCredentials, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                client,
                credentials,
                ttl,
                sessions: DashMap::new(),
                pending: DashMap::new(),
                logins: AtomicU64::new(0),
                invalidations: AtomicU64::new(0),
            }),
        }
    }

    /// Return a valid token for `(purpose, device)`, logging in only when
    /// no unexpired token is cached and no login is already running.
    pub async fn get_session(
        &self,
        purpose: Purpose,
        device: &Device,
    ) -> Result<String, CoreError> {
        let key = SessionKey::new(purpose, device);
        if let Some(token) = self.cached(&key) {
            trace!(%purpose, device = %device.id, "session cache hit");
            return Ok(token);
        }

        let login = match self.inner.pending.entry(key.clone()) {
            Entry::Occupied(entry) => {
                trace!(%purpose, device = %device.id, "joining in-flight login");
                entry.get().clone()
            }
            Entry::Vacant(entry) => {
                // A login may have landed between the cache check and the entry lock.
                if let Some(token) = self.cached(&key) {
                    return Ok(token);
                }
                let login = login_future(Arc::clone(&self.inner), key, device.address.clone());
                entry.insert(login.clone());
                login
            }
        };

        login.await
    }

    /// Evict the cached token for `(purpose, device)`. Never fails.
    pub fn invalidate(&self, purpose: Purpose, device: &Device) {
        let key = SessionKey::new(purpose, device);
        if self.inner.sessions.remove(&key).is_some() {
            debug!(%purpose, device = %device.id, "session invalidated");
        }
        self.inner.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            logins: self.inner.logins.load(Ordering::Relaxed),
            invalidations: self.inner.invalidations.load(Ordering::Relaxed),
            cached: self.inner.sessions.len(),
        }
    }

    fn cached(&self, key: &SessionKey) -> Option<String> {
        let entry = self.inner.sessions.get(key)?;
        (Instant::now() < entry.expires_at).then(|| entry.token.clone())
    }
}

fn login_future(inner: Arc<SessionInner>, key: SessionKey, address: String) -> LoginFuture {
    async move {
        inner.logins.fetch_add(1, Ordering::Relaxed);
        debug!(purpose = %key.purpose, device = %key.device_id, "logging in");

        let result = inner
            .client
            .login(
                &address,
                &inner.credentials.login,
                &inner.credentials.password,
            )
            .await
            .map_err(CoreError::from);

        if let Ok(token) = &result {
            inner.sessions.insert(
                key.clone(),
                CachedSession {
                    token: token.clone(),
                    expires_at: Instant::now() + inner.ttl,
                },
            );
        }
        inner.pending.remove(&key);
        result
    }
    .boxed()
    .shared()
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.inner.ttl)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn purposes_render_kebab_case() {
        let names: Vec<String> = Purpose::iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            ["health-check", "user-count", "user-listing", "coil-reading", "mutation"]
        );
    }
}
