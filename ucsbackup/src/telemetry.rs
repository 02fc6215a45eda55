//! Logging initialization.
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's call. This helper gives the CLI (and cron wrappers) one obvious
//! way to do it.

use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `verbosity` maps to a default filter (0 = warn, 1 = info, 2 = debug,
/// 3+ = trace) which `RUST_LOG` overrides when set. Calling this twice is a
/// no-op; the first subscriber wins.
pub fn init_logging(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ucsbackup={}", default_level)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
