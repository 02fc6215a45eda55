//! CLI error types.

use std::fmt;

use ucsbackup::archive::ArchiveError;
use ucsbackup::client::TransportError;

/// Errors surfaced to the operator with a non-zero exit code.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be resolved.
    Config(String),

    /// The HTTP client could not be constructed.
    ClientBuild(TransportError),

    /// A single archive operation failed.
    Archive(ArchiveError),

    /// The full workflow ran but did not complete; details were already
    /// printed in the status line.
    WorkflowFailed,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "configuration error: {}", msg),
            CliError::ClientBuild(e) => write!(f, "failed to build client: {}", e),
            CliError::Archive(e) => write!(f, "{}", e),
            CliError::WorkflowFailed => write!(f, "backup did not complete"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ClientBuild(e) => Some(e),
            CliError::Archive(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArchiveError> for CliError {
    fn from(e: ArchiveError) -> Self {
        CliError::Archive(e)
    }
}
