// ── Session-aware retry ──
//
// Runs one device operation with a cached session, invalidating the session
// after every failure so the next attempt logs in fresh. A failed login
// counts as a failed attempt. Configuration and validation failures end the
// loop at once.

use std::future::Future;

use tracing::{debug, warn};

use crate::error::CoreError;
use crate::registry::Device;
use crate::session::{Purpose, SessionManager};

/// Outcome of a retried operation plus how many attempts it took.
#[derive(Debug, Clone)]
pub struct Attempted<T> {
    pub attempts: u32,
    pub result: Result<T, CoreError>,
}

#[derive(Debug, Clone)]
pub struct RetryExecutor {
    sessions: SessionManager,
    max_attempts: u32,
}

impl RetryExecutor {
    /// `max_attempts` below one is treated as one.
    pub fn new(sessions: SessionManager, max_attempts: u32) -> Self {
        Self {
            sessions,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Run `operation` with a session for `(purpose, device)`.
    ///
    /// The operation receives the session token and is re-invoked with a
    /// fresh one after each retryable failure, up to `max_attempts` total.
    /// The last failure is returned when attempts run out.
    pub async fn run<T, F, Fut>(
        &self,
        purpose: Purpose,
        device: &Device,
        mut operation: F,
    ) -> Attempted<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let outcome = match self.sessions.get_session(purpose, device).await {
                Ok(session) => operation(session).await,
                Err(err) => Err(err),
            };

            let err = match outcome {
                Ok(value) => {
                    return Attempted {
                        attempts,
                        result: Ok(value),
                    };
                }
                Err(err) => err,
            };

            self.sessions.invalidate(purpose, device);

            if !err.is_retryable() {
                debug!(%purpose, device = %device.id, error = %err, "non-retryable failure");
                return Attempted {
                    attempts,
                    result: Err(err),
                };
            }
            if attempts >= self.max_attempts {
                warn!(
                    %purpose,
                    device = %device.id,
                    attempts,
                    error = %err,
                    "device operation failed"
                );
                return Attempted {
                    attempts,
                    result: Err(err),
                };
            }
            debug!(
                %purpose,
                device = %device.id,
                attempt = attempts,
                error = %err,
                "retrying with fresh session"
            );
        }
    }
}
