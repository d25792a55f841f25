// Printer / system endpoints

use serde_json::{Value, json};

use crate::client::DeviceClient;
use crate::error::Error;

impl DeviceClient {
    /// `POST get_coil_paper.fcgi?session=<token>`. Returns the raw payload;
    /// the reading may sit at the top level or inside a response wrapper.
    pub async fn coil_paper(&self, address: &str, session: &str) -> Result<Value, Error> {
        let url = self.endpoint_url(address, "get_coil_paper.fcgi", &[("session", session)])?;
        self.post_json(url, &json!({})).await?.error_for_status()?.json()
    }
}
