// Terminal session authentication
//
// `login.fcgi` trades the fleet credential pair for an opaque session
// token; `session_is_valid.fcgi` doubles as the liveness probe.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::DeviceClient;
use crate::error::{Error, preview};

#[derive(Deserialize)]
struct LoginResponse {
    session: Option<String>,
}

impl DeviceClient {
    /// Authenticate against one terminal and return its session token.
    ///
    /// `POST login.fcgi {login, password} -> {session}`
    pub async fn login(
        &self,
        address: &str,
        login: &str,
        password: &SecretString,
    ) -> Result<String, Error> {
        let url = self.endpoint_url(address, "login.fcgi", &[])?;
        debug!(address, "logging in");

        let body = json!({
            "login": login,
            "password": password.expose_secret(),
        });
        let resp = self.post_json(url, &body).await?;

        if !resp.ok() {
            return Err(Error::Login {
                message: format!(
                    "login failed (HTTP {}): {}",
                    resp.status(),
                    preview(&resp.text(), 200)
                ),
                status: Some(resp.status()),
            });
        }

        let payload: LoginResponse = resp.json()?;
        match payload.session {
            Some(session) if !session.trim().is_empty() => {
                debug!(address, "login successful");
                Ok(session)
            }
            _ => Err(Error::Login {
                message: "login response carried no session".into(),
                status: None,
            }),
        }
    }

    /// Probe whether `session` is accepted by the terminal.
    ///
    /// Firmware disagrees on the payload of this call (`true`, `{}`, or
    /// `{"session_is_valid": true}`), so any 2xx counts as alive and the
    /// body is never decoded.
    pub async fn session_is_valid(&self, address: &str, session: &str) -> Result<(), Error> {
        let url = self.endpoint_url(address, "session_is_valid.fcgi", &[("session", session)])?;
        self.post_json(url, &json!({})).await?.error_for_status()?;
        Ok(())
    }
}
