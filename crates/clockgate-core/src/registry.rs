// ── Device registry ──
//
// Static catalog of terminals, loaded once at startup. Answers the lookups
// the gateway needs: a site's devices in catalog order, a site's master
// terminal, and the set included in the coil sweep.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// One physical terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub site: String,
    pub label: String,
    /// Host or `host:port` the terminal answers on.
    pub address: String,
}

impl Device {
    pub fn new(
        id: impl Into<String>,
        site: impl Into<String>,
        label: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            site: site.into(),
            label: label.into(),
            address: address.into(),
        }
    }
}

/// Immutable catalog of the fleet.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    /// Site name (upper-cased) → master terminal address.
    masters: HashMap<String, String>,
    /// Addresses included in the coil sweep. Empty means every device.
    coil_monitored: Vec<String>,
}

impl DeviceRegistry {
    /// Build a registry, rejecting duplicate ids and blank addresses.
    pub fn new(devices: Vec<Device>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        for device in &devices {
            if device.address.trim().is_empty() {
                return Err(CoreError::configuration(format!(
                    "device '{}' has no address",
                    device.id
                )));
            }
            if !seen.insert(device.id.as_str()) {
                return Err(CoreError::configuration(format!(
                    "duplicate device id '{}'",
                    device.id
                )));
            }
        }
        Ok(Self {
            devices,
            masters: HashMap::new(),
            coil_monitored: Vec::new(),
        })
    }

    /// Designate the master terminal of `site` by address.
    pub fn with_master(mut self, site: &str, address: &str) -> Result<Self, CoreError> {
        let device = self.by_address(address)?;
        if !device.site.eq_ignore_ascii_case(site) {
            return Err(CoreError::configuration(format!(
                "master {address} belongs to site {}, not {site}",
                device.site
            )));
        }
        self.masters
            .insert(site.to_ascii_uppercase(), address.to_owned());
        Ok(self)
    }

    /// Restrict the coil sweep to the given addresses.
    pub fn with_coil_monitored(mut self, addresses: Vec<String>) -> Self {
        self.coil_monitored = addresses;
        self
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn by_address(&self, address: &str) -> Result<&Device, CoreError> {
        self.devices
            .iter()
            .find(|d| d.address == address)
            .ok_or_else(|| CoreError::configuration(format!("device not configured ({address})")))
    }

    /// Every device of `site`, in catalog order. Site names match
    /// case-insensitively.
    pub fn site_devices(&self, site: &str) -> Result<Vec<Device>, CoreError> {
        let devices: Vec<Device> = self
            .devices
            .iter()
            .filter(|d| d.site.eq_ignore_ascii_case(site))
            .cloned()
            .collect();
        if devices.is_empty() {
            return Err(CoreError::configuration(format!(
                "no devices configured for site {site}"
            )));
        }
        Ok(devices)
    }

    /// The terminal that answers site-wide reads (count, listing).
    ///
    /// Falls back to the first device of the site when no master is set.
    pub fn site_master(&self, site: &str) -> Result<&Device, CoreError> {
        match self.masters.get(&site.to_ascii_uppercase()) {
            Some(address) => self.by_address(address),
            None => self
                .devices
                .iter()
                .find(|d| d.site.eq_ignore_ascii_case(site))
                .ok_or_else(|| {
                    CoreError::configuration(format!("no devices configured for site {site}"))
                }),
        }
    }

    /// Devices included in the coil sweep, in catalog order.
    pub fn coil_monitored(&self) -> Vec<Device> {
        if self.coil_monitored.is_empty() {
            return self.devices.clone();
        }
        self.devices
            .iter()
            .filter(|d| self.coil_monitored.contains(&d.address))
            .cloned()
            .collect()
    }
}
