//! Backup commands: the full workflow and its individual phases.

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use ucsbackup::archive::{
    create_archive, download_archive, verify_archive, ArchiveName, CreationMode, ProgressFn,
};
use ucsbackup::config::DeviceConfig;
use ucsbackup::workflow::{run_backup, WorkflowOptions};

use crate::commands::common::build_client;
use crate::error::CliError;

fn creation_mode(force_async: bool) -> CreationMode {
    if force_async {
        CreationMode::ForceAsync
    } else {
        CreationMode::PreferDirect
    }
}

/// Run the full create/download/verify/cleanup workflow.
pub async fn run_full(
    device: &DeviceConfig,
    retention_days: u32,
    force_async: bool,
    skip_cleanup: bool,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let client = build_client(device)?;
    let options = WorkflowOptions {
        mode: creation_mode(force_async),
        retention_days,
        skip_cleanup,
    };

    let report = run_backup(&client, device, &options, cancel).await;
    println!("{}", report);

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::WorkflowFailed)
    }
}

/// Create an archive on the device without downloading it.
pub async fn create(
    device: &DeviceConfig,
    force_async: bool,
    cancel: &CancellationToken,
) -> Result<(), CliError> {
    let client = build_client(device)?;
    let report = create_archive(&client, device, creation_mode(force_async), cancel).await?;

    println!(
        "{} created in {:.1}s via {}",
        report.archive,
        report.elapsed.as_secs_f64(),
        report.path
    );
    Ok(())
}

/// Download a named archive with a progress bar.
pub async fn download(device: &DeviceConfig, name: &str) -> Result<(), CliError> {
    let client = build_client(device)?;
    let archive = ArchiveName::from_existing(name);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{bar:40} {bytes}/{total_bytes} ({bytes_per_sec})")
            .expect("valid progress template"),
    );
    let bar_handle = bar.clone();
    let progress: ProgressFn = Box::new(move |written, total| {
        if bar_handle.length() != Some(total) {
            bar_handle.set_length(total);
        }
        bar_handle.set_position(written);
    });

    let report = download_archive(&client, device, &archive, Some(progress)).await?;
    bar.finish_and_clear();

    println!(
        "{} -> {} ({} bytes in {:.1}s)",
        report.archive,
        report.local_path.display(),
        report.bytes_written,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

/// Verify a previously downloaded archive against the on-box copy.
pub async fn verify(device: &DeviceConfig, name: &str) -> Result<(), CliError> {
    let client = build_client(device)?;
    let archive = ArchiveName::from_existing(name);

    let pair = verify_archive(&client, device, &archive).await?;
    println!("{} verified ({})", archive, pair);
    Ok(())
}
