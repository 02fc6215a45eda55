//! Configuration master-key tracking.
//!
//! Standalone devices encrypt secrets in their configuration with a master
//! key; an archive restored onto replacement hardware is useless without it.
//! This module fetches the key over the command endpoint and appends it to a
//! local key file whenever it changes, giving operators a dated history.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use super::error::{ArchiveError, ArchiveResult};
use super::verify::run_remote_command;
use crate::client::RestClient;

/// Outcome of one master-key check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MasterKeyStatus {
    /// The key matches the most recent recorded entry.
    Unchanged,
    /// A new key was appended to the key file.
    Appended,
}

/// Result of a master-key check.
#[derive(Debug)]
pub struct MasterKeyReport {
    pub status: MasterKeyStatus,
    pub key_file: PathBuf,
}

impl std::fmt::Display for MasterKeyReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            MasterKeyStatus::Unchanged => write!(f, "master key unchanged"),
            MasterKeyStatus::Appended => {
                write!(f, "new master key appended to {}", self.key_file.display())
            }
        }
    }
}

/// Fetch the device master key and record it in `key_file` if it changed.
///
/// Key file lines have the form `{timestamp}/{key}`; only the last line is
/// consulted for the comparison. A missing key file is treated as an empty
/// history and created on first append.
pub async fn track_master_key(
    client: &dyn RestClient,
    key_file: &Path,
) -> ArchiveResult<MasterKeyReport> {
    let output = run_remote_command(client, " -c 'f5mku -K'".to_string()).await?;
    let key = output
        .split_whitespace()
        .next()
        .ok_or(ArchiveError::UnexpectedResponse {
            context: "master key query",
            detail: "empty f5mku output".to_string(),
        })?;

    let history = match fs::read_to_string(key_file) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(ArchiveError::ReadFailed {
                path: key_file.to_path_buf(),
                source: e,
            })
        }
    };

    let last_recorded = history
        .lines()
        .filter(|l| !l.trim().is_empty())
        .next_back()
        .and_then(|line| line.rsplit('/').next());

    if last_recorded == Some(key) {
        return Ok(MasterKeyReport {
            status: MasterKeyStatus::Unchanged,
            key_file: key_file.to_path_buf(),
        });
    }

    let entry = format!("{}/{}\n", Utc::now().format("%Y-%m-%d %H:%M:%S"), key);
    let mut updated = history;
    updated.push_str(&entry);
    fs::write(key_file, updated).map_err(|e| ArchiveError::WriteFailed {
        path: key_file.to_path_buf(),
        source: e,
    })?;

    info!(key_file = %key_file.display(), "recorded new master key");
    Ok(MasterKeyReport {
        status: MasterKeyStatus::Appended,
        key_file: key_file.to_path_buf(),
    })
}
