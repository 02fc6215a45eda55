//! Error types for the archive workflow.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::client::TransportError;

/// Result type for archive workflow operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur during archive creation, download, verification,
/// and cleanup.
///
/// Every failure is a value, never a panic; a phase failure short-circuits
/// the phases behind it but the caller decides what to do with the result.
#[derive(Debug)]
pub enum ArchiveError {
    /// The transport layer failed (connection, auth, HTTP status, timeout).
    Transport(TransportError),

    /// The device answered, but not with what the protocol requires.
    UnexpectedResponse {
        context: &'static str,
        detail: String,
    },

    /// A required field is absent from a JSON response.
    MissingField {
        context: &'static str,
        field: &'static str,
    },

    /// The async creation task reported a terminal failure state.
    TaskFailed { task_id: String, state: String },

    /// The async creation task did not complete within the poll budget.
    PollTimedOut { task_id: String, waited: Duration },

    /// Polling was cancelled from outside.
    Cancelled { task_id: String },

    /// A DELETE was rejected and the response does not describe an
    /// already-deleted resource.
    DeleteFailed {
        resource: &'static str,
        status: u16,
        body: String,
    },

    /// Failed to read a local file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a local file.
    WriteFailed { path: PathBuf, source: io::Error },

    /// The local archive copy does not exist.
    LocalFileMissing { path: PathBuf },

    /// Remote and local digests disagree.
    DigestMismatch {
        filename: String,
        remote: String,
        local: String,
    },
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport failure: {}", e),
            Self::UnexpectedResponse { context, detail } => {
                write!(f, "unexpected response during {}: {}", context, detail)
            }
            Self::MissingField { context, field } => {
                write!(f, "response to {} is missing field {:?}", context, field)
            }
            Self::TaskFailed { task_id, state } => {
                write!(f, "task {} ended in state {}", task_id, state)
            }
            Self::PollTimedOut { task_id, waited } => {
                write!(
                    f,
                    "task {} did not complete within {}s",
                    task_id,
                    waited.as_secs()
                )
            }
            Self::Cancelled { task_id } => {
                write!(f, "polling of task {} was cancelled", task_id)
            }
            Self::DeleteFailed {
                resource,
                status,
                body,
            } => {
                write!(f, "failed to delete {} (HTTP {}): {}", resource, status, body)
            }
            Self::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            Self::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            Self::LocalFileMissing { path } => {
                write!(f, "local archive {} does not exist", path.display())
            }
            Self::DigestMismatch {
                filename,
                remote,
                local,
            } => {
                write!(
                    f,
                    "digest mismatch for {}: remote {} != local {}",
                    filename, remote, local
                )
            }
        }
    }
}

impl std::error::Error for ArchiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::ReadFailed { source, .. } => Some(source),
            Self::WriteFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<TransportError> for ArchiveError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_digest_mismatch() {
        let err = ArchiveError::DigestMismatch {
            filename: "lb1_2026-08-08_142.ucs".to_string(),
            remote: "abc".to_string(),
            local: "def".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("abc"));
        assert!(text.contains("def"));
        assert!(!text.contains("match:"));
    }

    #[test]
    fn test_display_poll_timed_out() {
        let err = ArchiveError::PollTimedOut {
            task_id: "12345".to_string(),
            waited: Duration::from_secs(300),
        };
        assert!(err.to_string().contains("300s"));
    }

    #[test]
    fn test_transport_error_converts() {
        let err: ArchiveError = TransportError::ClientBuild("boom".to_string()).into();
        assert!(matches!(err, ArchiveError::Transport(_)));
    }
}
