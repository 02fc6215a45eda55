//! End-to-end backup workflow.
//!
//! Chains the archive phases in their required order (create, download,
//! verify, retention cleanup), short-circuiting the rest as soon as one
//! phase fails. The result keeps every phase outcome machine-legible while
//! `Display` renders the single human-readable status line operators expect
//! in job logs and mail reports.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::archive::{
    cleanup_archives, create_archive, download_archive, verify_archive, ArchiveError,
    ChecksumPair, CleanupReport, CreationMode, CreationReport, DownloadReport,
};
use crate::client::RestClient;
use crate::config::{DeviceConfig, DEFAULT_RETENTION_DAYS};

/// Tuning for one workflow invocation.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    /// How creation chooses between the direct and task paths.
    pub mode: CreationMode,
    /// Retention threshold for the final cleanup sweep, in days.
    pub retention_days: u32,
    /// Skip the cleanup sweep entirely.
    pub skip_cleanup: bool,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            mode: CreationMode::PreferDirect,
            retention_days: DEFAULT_RETENTION_DAYS,
            skip_cleanup: false,
        }
    }
}

/// Accumulated outcome of one workflow invocation.
///
/// Phases that never ran (because an earlier one failed) stay `None`; the
/// first failure is captured in `failure`.
#[derive(Debug, Default)]
pub struct WorkflowReport {
    pub creation: Option<CreationReport>,
    pub download: Option<DownloadReport>,
    pub checksums: Option<ChecksumPair>,
    pub cleanup: Option<CleanupReport>,
    pub failure: Option<ArchiveError>,
}

impl WorkflowReport {
    /// True when every attempted phase completed.
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

impl std::fmt::Display for WorkflowReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut wrote = false;
        let sep = |f: &mut std::fmt::Formatter<'_>, wrote: &mut bool| {
            if *wrote {
                write!(f, "; ")
            } else {
                *wrote = true;
                Ok(())
            }
        };

        if let Some(creation) = &self.creation {
            sep(f, &mut wrote)?;
            write!(
                f,
                "{} created in {:.1}s via {}",
                creation.archive,
                creation.elapsed.as_secs_f64(),
                creation.path
            )?;
        }
        if let Some(download) = &self.download {
            sep(f, &mut wrote)?;
            write!(
                f,
                "{} bytes downloaded in {:.1}s",
                download.bytes_written,
                download.elapsed.as_secs_f64()
            )?;
        }
        if let Some(checksums) = &self.checksums {
            sep(f, &mut wrote)?;
            write!(f, "{}", checksums)?;
        }
        if let Some(cleanup) = &self.cleanup {
            sep(f, &mut wrote)?;
            write!(f, "{}", cleanup)?;
        }
        if let Some(failure) = &self.failure {
            sep(f, &mut wrote)?;
            write!(f, "ERROR {}", failure)?;
        }
        if !wrote {
            write!(f, "no phases ran")?;
        }
        Ok(())
    }
}

/// Run the full backup workflow against one device.
///
/// Never returns an `Err`: every failure is captured in the report so the
/// caller gets the partial outcomes alongside it.
pub async fn run_backup(
    client: &dyn RestClient,
    config: &DeviceConfig,
    options: &WorkflowOptions,
    cancel: &CancellationToken,
) -> WorkflowReport {
    let mut report = WorkflowReport::default();

    let creation = match create_archive(client, config, options.mode, cancel).await {
        Ok(creation) => creation,
        Err(e) => {
            report.failure = Some(e);
            return report;
        }
    };
    info!(archive = %creation.archive, path = %creation.path, "archive created");
    let archive = creation.archive.clone();
    report.creation = Some(creation);

    match download_archive(client, config, &archive, None).await {
        Ok(download) => {
            info!(bytes = download.bytes_written, "archive downloaded");
            report.download = Some(download);
        }
        Err(e) => {
            report.failure = Some(e);
            return report;
        }
    }

    match verify_archive(client, config, &archive).await {
        Ok(checksums) => report.checksums = Some(checksums),
        Err(e) => {
            report.failure = Some(e);
            return report;
        }
    }

    if !options.skip_cleanup {
        match cleanup_archives(client, options.retention_days).await {
            Ok(cleanup) => report.cleanup = Some(cleanup),
            Err(e) => report.failure = Some(e),
        }
    }

    report
}
