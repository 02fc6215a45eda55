//! Retention cleanup of remote archives.
//!
//! Lists the archives held on the device and deletes every entry older than
//! the retention threshold. Entries whose creation timestamp cannot be
//! parsed are skipped, never deleted: an archive of unknown age is not
//! provably expired.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use super::create::UCS_ENDPOINT;
use super::error::{ArchiveError, ArchiveResult};
use crate::client::RestClient;

/// One archive from the remote listing.
#[derive(Debug, Clone)]
pub struct RetentionEntry {
    /// Filename as reported, possibly with its on-device path prefix.
    pub filename: String,
    /// Creation timestamp, when the reported value was parsable.
    pub created: Option<NaiveDateTime>,
    /// Size in bytes, when reported.
    pub size_bytes: Option<u64>,
}

impl RetentionEntry {
    /// Filename without the on-device path prefix.
    pub fn basename(&self) -> &str {
        self.filename.rsplit('/').next().unwrap_or(&self.filename)
    }
}

/// One deleted archive, for the cleanup report.
#[derive(Debug, Clone)]
pub struct DeletedArchive {
    pub filename: String,
    pub created: NaiveDateTime,
}

/// Result of one cleanup sweep.
///
/// An empty `deleted` list is a distinct, reportable outcome ("ran
/// successfully, nothing to do"), not an error and never an empty string.
#[derive(Debug)]
pub struct CleanupReport {
    pub deleted: Vec<DeletedArchive>,
    /// Entries skipped because their timestamp was missing or unparsable.
    pub skipped_unparsable: usize,
    pub examined: usize,
    /// The instant the sweep compared ages against.
    pub swept_at: DateTime<Utc>,
}

impl std::fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.deleted.is_empty() {
            return write!(
                f,
                "nothing to delete at {} ({} archives examined)",
                self.swept_at.format("%Y-%m-%d %H:%M:%S"),
                self.examined
            );
        }
        for (i, archive) in self.deleted.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(
                f,
                "DELETED {} created {}",
                archive.filename, archive.created
            )?;
        }
        if self.skipped_unparsable > 0 {
            write!(f, "; {} entries skipped (unparsable age)", self.skipped_unparsable)?;
        }
        Ok(())
    }
}

/// Raw listing shapes as the device reports them.
#[derive(Debug, Deserialize)]
struct UcsListing {
    #[serde(default)]
    items: Vec<UcsItem>,
}

#[derive(Debug, Deserialize)]
struct UcsItem {
    #[serde(rename = "apiRawValues")]
    api_raw_values: Option<RawValues>,
}

#[derive(Debug, Deserialize)]
struct RawValues {
    filename: String,
    #[serde(rename = "file_created_date")]
    created: Option<String>,
    #[serde(rename = "file_size")]
    size: Option<String>,
}

/// Fetch the remote archive listing.
pub async fn list_archives(client: &dyn RestClient) -> ArchiveResult<Vec<RetentionEntry>> {
    let raw = client.get_json(UCS_ENDPOINT, None).await?;
    let listing: UcsListing =
        serde_json::from_value(raw).map_err(|e| ArchiveError::UnexpectedResponse {
            context: "archive listing",
            detail: e.to_string(),
        })?;

    Ok(listing
        .items
        .into_iter()
        .filter_map(|item| item.api_raw_values)
        .map(|raw| RetentionEntry {
            created: raw.created.as_deref().and_then(parse_created),
            size_bytes: raw.size.as_deref().and_then(parse_size),
            filename: raw.filename,
        })
        .collect())
}

/// Delete every remote archive older than `threshold_days`.
///
/// # Errors
///
/// `Transport` if the listing cannot be fetched, `DeleteFailed` if the
/// device rejects a delete. A delete failure aborts the sweep; already
/// deleted entries stay deleted.
pub async fn cleanup_archives(
    client: &dyn RestClient,
    threshold_days: u32,
) -> ArchiveResult<CleanupReport> {
    cleanup_archives_at(client, threshold_days, Utc::now()).await
}

async fn cleanup_archives_at(
    client: &dyn RestClient,
    threshold_days: u32,
    now: DateTime<Utc>,
) -> ArchiveResult<CleanupReport> {
    let entries = list_archives(client).await?;
    let threshold = Duration::days(i64::from(threshold_days));

    let mut report = CleanupReport {
        deleted: Vec::new(),
        skipped_unparsable: 0,
        examined: entries.len(),
        swept_at: now,
    };

    for entry in entries {
        let Some(created) = entry.created else {
            debug!(filename = %entry.filename, "skipping archive with unparsable age");
            report.skipped_unparsable += 1;
            continue;
        };

        if created + threshold >= now.naive_utc() {
            continue;
        }

        let path = format!("{}/{}", UCS_ENDPOINT, entry.basename());
        let response = client.delete(&path).await?;
        if !response.is_success() {
            return Err(ArchiveError::DeleteFailed {
                resource: "archive",
                status: response.status,
                body: response.body,
            });
        }

        info!(filename = %entry.filename, %created, "deleted expired archive");
        report.deleted.push(DeletedArchive {
            filename: entry.filename,
            created,
        });
    }

    Ok(report)
}

/// Parse the reported creation timestamp at minute precision.
///
/// The device reports e.g. `2026-08-01T10:30:00Z`; only the
/// `YYYY-MM-DDTHH:MM` prefix is interpreted.
fn parse_created(raw: &str) -> Option<NaiveDateTime> {
    let prefix = raw.get(..16)?;
    NaiveDateTime::parse_from_str(prefix, "%Y-%m-%dT%H:%M").ok()
}

/// Parse the reported size, e.g. `"3875328 (in bytes)"`.
fn parse_size(raw: &str) -> Option<u64> {
    raw.split_whitespace().next()?.parse().ok()
}
