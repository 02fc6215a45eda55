//! Shared command plumbing: config resolution and client construction.

use std::path::PathBuf;

use ucsbackup::client::ReqwestClient;
use ucsbackup::config::{ConfigFile, DeviceConfig, DEFAULT_RETENTION_DAYS};

use crate::error::CliError;

/// Device settings taken from global CLI flags.
#[derive(Debug, Default)]
pub struct DeviceOverrides {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub insecure: bool,
    pub config_path: Option<PathBuf>,
}

/// Resolved settings for one invocation.
#[derive(Debug)]
pub struct Resolved {
    pub device: DeviceConfig,
    pub retention_days: u32,
}

/// Resolve the device config from flags and the config file.
///
/// When host, username, and password are all given on the command line the
/// config file is not consulted at all; otherwise it is loaded (from
/// `--config` or the default path) and individual flags override its values.
pub fn resolve(overrides: &DeviceOverrides) -> Result<Resolved, CliError> {
    let mut resolved = match (&overrides.host, &overrides.username, &overrides.password) {
        (Some(host), Some(username), Some(password)) => Resolved {
            device: DeviceConfig::new(host, username, password),
            retention_days: DEFAULT_RETENTION_DAYS,
        },
        _ => {
            let file = match &overrides.config_path {
                Some(path) => ConfigFile::load_from(path),
                None => ConfigFile::load(),
            }
            .map_err(|e| CliError::Config(e.to_string()))?;

            let mut device = file.device;
            if let Some(host) = &overrides.host {
                device.host = host.clone();
            }
            if let Some(username) = &overrides.username {
                device.username = username.clone();
            }
            if let Some(password) = &overrides.password {
                device.password = password.clone();
            }
            Resolved {
                device,
                retention_days: file.retention_days,
            }
        }
    };

    if overrides.insecure {
        resolved.device.accept_invalid_certs = true;
    }
    Ok(resolved)
}

/// Build the HTTP client for a resolved device.
pub fn build_client(device: &DeviceConfig) -> Result<ReqwestClient, CliError> {
    ReqwestClient::new(device).map_err(CliError::ClientBuild)
}
