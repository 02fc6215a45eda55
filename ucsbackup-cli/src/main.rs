//! ucsbackup - configuration archive backups over iControl REST.
//!
//! Subcommands map one-to-one onto the library's workflow phases, plus a
//! `run` command chaining all of them. Ctrl-C cancels in-flight task
//! polling cooperatively instead of leaving the process to be killed.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use commands::common::{self, DeviceOverrides};
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "ucsbackup", version, about = "Appliance configuration archive backups")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target device, overriding the config file
    #[arg(long, global = true)]
    host: Option<String>,

    /// Username, overriding the config file
    #[arg(long, global = true)]
    username: Option<String>,

    /// Password, overriding the config file
    #[arg(long, global = true)]
    password: Option<String>,

    /// Accept the device's self-signed certificate
    #[arg(long, global = true)]
    insecure: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create, download, verify, and clean up in one run
    Run {
        /// Skip the direct save and go straight to the async task
        #[arg(long)]
        async_task: bool,
        /// Retention threshold in days, overriding the config file
        #[arg(long)]
        retention_days: Option<u32>,
        /// Do not delete old remote archives afterwards
        #[arg(long)]
        skip_cleanup: bool,
    },
    /// Create an archive on the device without downloading it
    Create {
        /// Skip the direct save and go straight to the async task
        #[arg(long)]
        async_task: bool,
    },
    /// Download a named archive into the local archive directory
    Download { name: String },
    /// Verify a downloaded archive against the on-box copy
    Verify { name: String },
    /// Delete remote archives older than the retention threshold
    Cleanup {
        /// Retention threshold in days, overriding the config file
        #[arg(long)]
        older_than: Option<u32>,
    },
    /// List archives currently on the device
    List,
    /// Record the device master key if it changed
    Masterkey,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    ucsbackup::telemetry::init_logging(cli.verbose);

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("interrupt received, cancelling...");
        handler_token.cancel();
    }) {
        debug!(error = %e, "could not install interrupt handler");
    }

    if let Err(e) = run(cli, &cancel).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<(), CliError> {
    let overrides = DeviceOverrides {
        host: cli.host,
        username: cli.username,
        password: cli.password,
        insecure: cli.insecure,
        config_path: cli.config,
    };
    let resolved = common::resolve(&overrides)?;

    match cli.command {
        Command::Run {
            async_task,
            retention_days,
            skip_cleanup,
        } => {
            let retention = retention_days.unwrap_or(resolved.retention_days);
            commands::backup::run_full(
                &resolved.device,
                retention,
                async_task,
                skip_cleanup,
                cancel,
            )
            .await
        }
        Command::Create { async_task } => {
            commands::backup::create(&resolved.device, async_task, cancel).await
        }
        Command::Download { name } => commands::backup::download(&resolved.device, &name).await,
        Command::Verify { name } => commands::backup::verify(&resolved.device, &name).await,
        Command::Cleanup { older_than } => {
            let retention = older_than.unwrap_or(resolved.retention_days);
            commands::maintenance::cleanup(&resolved.device, retention).await
        }
        Command::List => commands::maintenance::list(&resolved.device).await,
        Command::Masterkey => commands::maintenance::masterkey(&resolved.device).await,
    }
}
