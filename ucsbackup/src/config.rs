//! Device and workflow configuration.
//!
//! Configuration is an explicit value passed into every operation. Nothing in
//! this crate reads ambient global state, so one process can safely drive
//! backups against several distinct devices at once.
//!
//! `ConfigFile` loads settings from an INI file under the platform config
//! directory (`~/.config/ucsbackup/config.ini` on Linux); `DeviceConfig` is
//! the resolved value the workflow consumes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;

/// Default download chunk size (512 KiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 512 * 1024;

/// Default interval between task status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default upper bound on total task-poll wait time.
///
/// The appliance gives no completion estimate, so the budget has to be
/// generous; archives on busy devices have been observed to take minutes.
pub const DEFAULT_POLL_BUDGET: Duration = Duration::from_secs(300);

/// Default per-request timeout. Direct (non-task) archive saves run inside
/// a single request and the appliance aborts them at about this mark.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default retention threshold for remote cleanup, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

/// Resolved configuration for one target device.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Hostname or IP of the target appliance.
    pub host: String,
    /// Account used for REST authentication. Checksum and master-key calls
    /// run shell commands on the appliance and need an admin account.
    pub username: String,
    /// Password for `username`.
    pub password: String,
    /// Local directory where downloaded archives are stored.
    pub archive_dir: PathBuf,
    /// Byte window per range request.
    pub chunk_size: u64,
    /// Sleep between task status polls.
    pub poll_interval: Duration,
    /// Maximum total wait for an async task to complete.
    pub poll_budget: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Accept self-signed device certificates. Most appliances ship with
    /// them, but this still has to be an explicit opt-in.
    pub accept_invalid_certs: bool,
}

impl DeviceConfig {
    /// Create a config with default tuning for the given device.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            archive_dir: PathBuf::from("backups"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_budget: DEFAULT_POLL_BUDGET,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
        }
    }

    /// Set the local archive directory.
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = dir.into();
        self
    }

    /// Set the download chunk size.
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set the task poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the total task-poll budget.
    pub fn with_poll_budget(mut self, budget: Duration) -> Self {
        self.poll_budget = budget;
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Accept self-signed device certificates.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Errors raised while loading or interpreting the config file.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read or parsed as INI.
    Load { path: PathBuf, reason: String },
    /// A required key is absent.
    MissingKey {
        section: &'static str,
        key: &'static str,
    },
    /// A key is present but not interpretable.
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load { path, reason } => {
                write!(f, "failed to load config {}: {}", path.display(), reason)
            }
            Self::MissingKey { section, key } => {
                write!(f, "config is missing [{}] {}", section, key)
            }
            Self::InvalidValue {
                section,
                key,
                value,
            } => {
                write!(f, "config [{}] {} has invalid value {:?}", section, key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// On-disk configuration, resolved into a `DeviceConfig`.
///
/// # Format
///
/// ```ini
/// [device]
/// host = lb1.example.net
/// username = admin
/// password = secret
///
/// [backup]
/// directory = /var/backups/ucs
/// chunk_size = 524288
/// retention_days = 7
///
/// [http]
/// timeout_secs = 60
/// accept_invalid_certs = true
/// poll_interval_secs = 2
/// poll_budget_secs = 300
/// ```
///
/// Only the `[device]` keys are required; everything else falls back to the
/// defaults above.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub device: DeviceConfig,
    pub retention_days: u32,
}

impl ConfigFile {
    /// Default config file path under the platform config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ucsbackup")
            .join("config.ini")
    }

    /// Load from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let host = require(ini, "device", "host")?;
        let username = require(ini, "device", "username")?;
        let password = require(ini, "device", "password")?;

        let mut device = DeviceConfig::new(host, username, password);

        if let Some(dir) = get(ini, "backup", "directory") {
            device.archive_dir = PathBuf::from(dir);
        }
        if let Some(raw) = get(ini, "backup", "chunk_size") {
            device.chunk_size = parse_u64("backup", "chunk_size", raw)?;
        }
        let retention_days = match get(ini, "backup", "retention_days") {
            Some(raw) => parse_u64("backup", "retention_days", raw)? as u32,
            None => DEFAULT_RETENTION_DAYS,
        };

        if let Some(raw) = get(ini, "http", "timeout_secs") {
            device.request_timeout = Duration::from_secs(parse_u64("http", "timeout_secs", raw)?);
        }
        if let Some(raw) = get(ini, "http", "poll_interval_secs") {
            device.poll_interval =
                Duration::from_secs(parse_u64("http", "poll_interval_secs", raw)?);
        }
        if let Some(raw) = get(ini, "http", "poll_budget_secs") {
            device.poll_budget = Duration::from_secs(parse_u64("http", "poll_budget_secs", raw)?);
        }
        if let Some(raw) = get(ini, "http", "accept_invalid_certs") {
            device.accept_invalid_certs = match raw {
                "true" | "yes" | "1" => true,
                "false" | "no" | "0" => false,
                other => {
                    return Err(ConfigError::InvalidValue {
                        section: "http",
                        key: "accept_invalid_certs",
                        value: other.to_string(),
                    })
                }
            };
        }

        Ok(Self {
            device,
            retention_days,
        })
    }
}

fn get<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.section(Some(section)).and_then(|s| s.get(key))
}

fn require(ini: &Ini, section: &'static str, key: &'static str) -> Result<String, ConfigError> {
    get(ini, section, key)
        .map(str::to_string)
        .ok_or(ConfigError::MissingKey { section, key })
}

fn parse_u64(section: &'static str, key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        section,
        key,
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_device_config_defaults() {
        let config = DeviceConfig::new("10.9.8.7", "admin", "secret");
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(config.poll_budget, DEFAULT_POLL_BUDGET);
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_device_config_builders() {
        let config = DeviceConfig::new("10.9.8.7", "admin", "secret")
            .with_chunk_size(1024)
            .with_poll_interval(Duration::from_millis(500))
            .with_poll_budget(Duration::from_secs(30))
            .with_archive_dir("/tmp/ucs")
            .with_accept_invalid_certs(true);

        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.poll_budget, Duration::from_secs(30));
        assert_eq!(config.archive_dir, PathBuf::from("/tmp/ucs"));
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_config_file_minimal() {
        let (_dir, path) = write_config(
            "[device]\nhost = lb1.example.net\nusername = admin\npassword = secret\n",
        );

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.device.host, "lb1.example.net");
        assert_eq!(config.device.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.retention_days, DEFAULT_RETENTION_DAYS);
    }

    #[test]
    fn test_config_file_full() {
        let (_dir, path) = write_config(
            "[device]\nhost = lb1\nusername = admin\npassword = s\n\
             [backup]\ndirectory = /var/backups\nchunk_size = 1024\nretention_days = 14\n\
             [http]\ntimeout_secs = 30\npoll_interval_secs = 1\npoll_budget_secs = 120\n\
             accept_invalid_certs = true\n",
        );

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.device.archive_dir, PathBuf::from("/var/backups"));
        assert_eq!(config.device.chunk_size, 1024);
        assert_eq!(config.retention_days, 14);
        assert_eq!(config.device.request_timeout, Duration::from_secs(30));
        assert_eq!(config.device.poll_interval, Duration::from_secs(1));
        assert_eq!(config.device.poll_budget, Duration::from_secs(120));
        assert!(config.device.accept_invalid_certs);
    }

    #[test]
    fn test_config_file_missing_key() {
        let (_dir, path) = write_config("[device]\nhost = lb1\nusername = admin\n");

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingKey {
                section: "device",
                key: "password"
            }
        ));
    }

    #[test]
    fn test_config_file_invalid_number() {
        let (_dir, path) = write_config(
            "[device]\nhost = lb1\nusername = a\npassword = b\n[backup]\nchunk_size = big\n",
        );

        let err = ConfigFile::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("chunk_size"));
    }
}
