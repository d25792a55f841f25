// User endpoints
//
// Counting, listing and the mutation family (`update_users`, `add_users`,
// `remove_users`). Payloads are passed through as raw JSON: their shape
// varies across firmware and is normalized by the caller.

use serde_json::{Value, json};
use tracing::debug;

use crate::client::{DeviceClient, DeviceResponse};
use crate::error::Error;

impl DeviceClient {
    /// `POST count_users.fcgi?session=<token> -> {count}`
    ///
    /// An absent count reads as zero; anything non-numeric is an error.
    pub async fn count_users(&self, address: &str, session: &str) -> Result<u64, Error> {
        let url = self.endpoint_url(address, "count_users.fcgi", &[("session", session)])?;
        let resp = self.post_json(url, &json!({})).await?.error_for_status()?;
        let payload: Value = resp.json()?;

        match payload.get("count") {
            None | Some(Value::Null) => Ok(0),
            Some(value) => parse_count(value).ok_or_else(|| Error::Deserialization {
                message: format!("count response is not numeric: {value}"),
                body: resp.text(),
            }),
        }
    }

    /// `POST load_users.fcgi?mode=<m>&session=<token>` with either a
    /// pagination or an identifier-filter body. Returns the raw payload.
    pub async fn load_users(
        &self,
        address: &str,
        session: &str,
        mode: &str,
        body: &Value,
    ) -> Result<Value, Error> {
        let url = self.endpoint_url(
            address,
            "load_users.fcgi",
            &[("mode", mode), ("session", session)],
        )?;
        debug!(address, mode, "loading users");
        self.post_json(url, body).await?.error_for_status()?.json()
    }

    /// Post a mutation body to `endpoint`, appending `mode` when given.
    ///
    /// Non-2xx statuses become [`Error::Http`]; a 2xx response is returned
    /// untouched so the caller can apply its own success-flag checks.
    pub async fn mutate_users(
        &self,
        address: &str,
        session: &str,
        endpoint: &str,
        mode: Option<&str>,
        body: &Value,
    ) -> Result<DeviceResponse, Error> {
        let mut query = vec![("session", session)];
        if let Some(mode) = mode {
            query.push(("mode", mode));
        }
        let url = self.endpoint_url(address, endpoint, &query)?;
        debug!(address, endpoint, "posting user mutation");
        self.post_json(url, body).await?.error_for_status()
    }
}

fn parse_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_count)),
        Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_count))
        }
        _ => None,
    }
}

/// Truncate a finite, non-negative float toward zero.
fn whole_count(f: f64) -> Option<u64> {
    if !f.is_finite() || f < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    let whole = f.trunc() as u64;
    Some(whole)
}
