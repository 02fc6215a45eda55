//! Download integrity verification.
//!
//! The device computes an MD5 of its on-box copy through the bash utility
//! endpoint, and the local copy is hashed independently; the transfer is
//! verified only when both digests match exactly. MD5 is what the `md5sum`
//! tool on the appliance produces; this is a transmission-corruption check,
//! not a security boundary.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;

use super::error::{ArchiveError, ArchiveResult};
use super::naming::ArchiveName;
use crate::client::RestClient;
use crate::config::DeviceConfig;

/// REST endpoint running shell commands on the device. Requires an admin
/// account.
pub const BASH_ENDPOINT: &str = "/mgmt/tm/util/bash";

/// Directory on the device where archives are stored.
pub const REMOTE_ARCHIVE_DIR: &str = "/var/local/ucs";

/// Buffer size for hashing local files (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Matching pair of independently computed digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumPair {
    pub remote: String,
    pub local: String,
}

impl std::fmt::Display for ChecksumPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "remote:local {}:{}", self.remote, self.local)
    }
}

/// Run a shell command on the device and return its output text.
///
/// `args` is passed to `bash -c`, so it must be a single quoted command
/// string like `" -c 'md5sum /var/local/ucs/x.ucs'"`.
pub(crate) async fn run_remote_command(
    client: &dyn RestClient,
    args: String,
) -> ArchiveResult<String> {
    let payload = json!({ "command": "run", "utilCmdArgs": args });
    let response = client.post_json(BASH_ENDPOINT, &payload).await?;
    response
        .get("commandResult")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ArchiveError::MissingField {
            context: "remote command",
            field: "commandResult",
        })
}

/// Verify that the local copy of an archive is byte-identical to the
/// remote one.
///
/// # Errors
///
/// `LocalFileMissing` when the downloaded copy is absent (distinct from a
/// mismatch), `DigestMismatch` carrying both digests when they disagree,
/// and `Transport`/`MissingField` for remote-side failures.
pub async fn verify_archive(
    client: &dyn RestClient,
    config: &DeviceConfig,
    archive: &ArchiveName,
) -> ArchiveResult<ChecksumPair> {
    let remote = remote_digest(client, archive).await?;

    let local_path = config.archive_dir.join(archive.as_str());
    if !local_path.is_file() {
        return Err(ArchiveError::LocalFileMissing { path: local_path });
    }
    let local = local_digest(&local_path)?;

    if remote != local {
        return Err(ArchiveError::DigestMismatch {
            filename: archive.as_str().to_string(),
            remote,
            local,
        });
    }

    debug!(archive = %archive, digest = %remote, "checksums match");
    Ok(ChecksumPair { remote, local })
}

/// MD5 of the on-box copy, via `md5sum` on the device.
async fn remote_digest(client: &dyn RestClient, archive: &ArchiveName) -> ArchiveResult<String> {
    let args = format!(" -c 'md5sum {}/{}'", REMOTE_ARCHIVE_DIR, archive.as_str());
    let output = run_remote_command(client, args).await?;

    // md5sum prints "{digest}  {path}".
    output
        .split_whitespace()
        .next()
        .map(str::to_string)
        .ok_or(ArchiveError::UnexpectedResponse {
            context: "remote checksum",
            detail: "empty md5sum output".to_string(),
        })
}

/// MD5 of a local file, read in buffered chunks.
fn local_digest(path: &Path) -> ArchiveResult<String> {
    let mut file = File::open(path).map_err(|e| ArchiveError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| ArchiveError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        if bytes_read == 0 {
            break;
        }
        context.consume(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", context.compute()))
}
