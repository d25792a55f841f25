//! Bridge from `clockgate_config` and global flags to core types.

use std::path::PathBuf;
use std::time::Duration;

use clockgate_config::Config;
use clockgate_core::{DeviceRegistry, Gateway};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config` or the platform default.
pub fn effective_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(clockgate_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = effective_path(global);
    tracing::debug!(path = %path.display(), "loading config");
    Ok(clockgate_config::load_config(Some(&path))?)
}

/// Registry only. No credentials are resolved.
pub fn build_registry(global: &GlobalOpts) -> Result<DeviceRegistry, CliError> {
    let cfg = load(global)?;
    Ok(clockgate_config::build_registry(&cfg)?)
}

/// Full gateway, with `--timeout-ms` applied over the file value.
pub fn build_gateway(global: &GlobalOpts) -> Result<Gateway, CliError> {
    let cfg = load(global)?;
    if cfg.devices.is_empty() {
        return Err(CliError::NoDevices {
            path: effective_path(global).display().to_string(),
        });
    }

    let registry = clockgate_config::build_registry(&cfg)?;
    let mut gateway_config = clockgate_config::to_gateway_config(&cfg)?;

    if let Some(ms) = global.timeout_ms {
        if ms == 0 {
            return Err(CliError::Validation {
                field: "timeout-ms".into(),
                reason: "must be positive".into(),
            });
        }
        gateway_config.transport = gateway_config
            .transport
            .with_timeout(Duration::from_millis(ms));
    }

    Ok(Gateway::new(gateway_config, registry)?)
}
