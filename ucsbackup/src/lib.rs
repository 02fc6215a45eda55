//! ucsbackup - configuration archive backups for network appliances
//!
//! This library drives the full archive lifecycle against an appliance's
//! REST API: trigger archive creation (with an async-task fallback for
//! archives too large to save inside one request), poll the creation job,
//! download the archive in byte-range chunks, verify the transfer with an
//! MD5 digest pair, and delete remote archives past their retention
//! threshold.
//!
//! # Example
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//! use ucsbackup::client::ReqwestClient;
//! use ucsbackup::config::DeviceConfig;
//! use ucsbackup::workflow::{run_backup, WorkflowOptions};
//!
//! let config = DeviceConfig::new("lb1.example.net", "admin", "secret")
//!     .with_archive_dir("/var/backups/ucs")
//!     .with_accept_invalid_certs(true);
//! let client = ReqwestClient::new(&config)?;
//!
//! let report = run_backup(
//!     &client,
//!     &config,
//!     &WorkflowOptions::default(),
//!     &CancellationToken::new(),
//! )
//! .await;
//! println!("{}", report);
//! ```

pub mod archive;
pub mod client;
pub mod config;
pub mod telemetry;
pub mod workflow;

pub use archive::{ArchiveError, ArchiveName, ArchiveResult};
pub use config::{ConfigFile, DeviceConfig};
pub use workflow::{run_backup, WorkflowOptions, WorkflowReport};
