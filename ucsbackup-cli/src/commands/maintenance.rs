//! Maintenance commands: remote listing, retention cleanup, and master-key
//! tracking.

use ucsbackup::archive::{cleanup_archives, list_archives, track_master_key};
use ucsbackup::config::DeviceConfig;

use crate::commands::common::build_client;
use crate::error::CliError;

/// Print the remote archive listing.
pub async fn list(device: &DeviceConfig) -> Result<(), CliError> {
    let client = build_client(device)?;
    let entries = list_archives(&client).await?;

    if entries.is_empty() {
        println!("No archives on {}", device.host);
        return Ok(());
    }

    println!("Archives on {}:", device.host);
    for entry in entries {
        let created = entry
            .created
            .map(|t| t.to_string())
            .unwrap_or_else(|| "unknown age".to_string());
        let size = entry
            .size_bytes
            .map(|b| format!("{} bytes", b))
            .unwrap_or_else(|| "unknown size".to_string());
        println!("  {}  {}  {}", entry.basename(), created, size);
    }
    Ok(())
}

/// Delete remote archives older than the retention threshold.
pub async fn cleanup(device: &DeviceConfig, retention_days: u32) -> Result<(), CliError> {
    let client = build_client(device)?;
    let report = cleanup_archives(&client, retention_days).await?;
    println!("{}", report);
    Ok(())
}

/// Check the device master key against the local key file.
pub async fn masterkey(device: &DeviceConfig) -> Result<(), CliError> {
    let client = build_client(device)?;
    let key_file = device.archive_dir.join("masterkey.txt");
    let report = track_master_key(&client, &key_file).await?;
    println!("{}", report);
    Ok(())
}
