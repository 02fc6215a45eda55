//! Archive creation with synchronous save and async-task fallback.
//!
//! Small archives are created with one direct `POST /mgmt/tm/sys/ucs` call.
//! The device aborts that request at roughly its 60 second limit while large
//! archives are still being assembled, so any direct failure falls back to
//! the task-based path: create a task, start it, poll until `COMPLETED`,
//! reconfirm via the result sub-resource, then delete result and task so no
//! orphaned jobs accumulate on the device.

use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::{ArchiveError, ArchiveResult};
use super::naming::{derive_archive_name, random_disambiguator, ArchiveName};
use super::task::{AsyncTask, TaskState, TASK_ACK_PHRASE, TASK_ENDPOINT};
use crate::client::RestClient;
use crate::config::DeviceConfig;

/// REST endpoint for direct (synchronous) archive saves and the archive
/// listing.
pub const UCS_ENDPOINT: &str = "/mgmt/tm/sys/ucs";

/// REST endpoint carrying the device hostname.
pub const GLOBAL_SETTINGS_ENDPOINT: &str = "/mgmt/tm/sys/global-settings";

/// Query string limiting the global-settings response to the hostname field.
pub const HOSTNAME_QUERY: &str = "$select=hostname";

/// How a creation call should choose between the two paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationMode {
    /// Try the direct save first, falling back to a task on failure.
    PreferDirect,
    /// Skip the direct save. Used when the archive is known to be large
    /// enough that the direct call would only burn its timeout.
    ForceAsync,
}

/// Which path actually produced the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreationPath {
    Direct,
    AsyncTask,
}

impl std::fmt::Display for CreationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct save"),
            Self::AsyncTask => f.write_str("async task"),
        }
    }
}

/// Successful creation result.
#[derive(Debug)]
pub struct CreationReport {
    pub archive: ArchiveName,
    /// Wall-clock duration of the creation attempt, measured from just
    /// before the first save call to completion.
    pub elapsed: Duration,
    pub path: CreationPath,
}

/// Outcome of an idempotent DELETE.
///
/// The device races its own task/result teardown against client deletes, so
/// "it was already gone" is a satisfied postcondition, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyDeleted,
}

/// Create an archive on the device.
///
/// Resolves the device hostname, derives a fresh archive name, and runs the
/// direct or task-based creation path per `mode`. Polling of the async task
/// is bounded by `config.poll_budget` and can be stopped early through
/// `cancel`.
///
/// # Errors
///
/// A hostname-query failure aborts the whole operation. A direct-save
/// failure does not: it triggers the async fallback. Async-path failures
/// are returned as their specific kind (`UnexpectedResponse`, `TaskFailed`,
/// `PollTimedOut`, `Cancelled`, `DeleteFailed`, or `Transport`).
pub async fn create_archive(
    client: &dyn RestClient,
    config: &DeviceConfig,
    mode: CreationMode,
    cancel: &CancellationToken,
) -> ArchiveResult<CreationReport> {
    let hostname = fetch_hostname(client).await?;
    let archive = derive_archive_name(
        &hostname,
        chrono::Utc::now().date_naive(),
        random_disambiguator(),
    );
    debug!(archive = %archive, "derived archive name");

    let payload = json!({ "command": "save", "name": archive.as_str() });
    let started = std::time::Instant::now();

    if mode == CreationMode::PreferDirect {
        match client.post_json(UCS_ENDPOINT, &payload).await {
            Ok(_) => {
                return Ok(CreationReport {
                    archive,
                    elapsed: started.elapsed(),
                    path: CreationPath::Direct,
                });
            }
            Err(e) => {
                // Direct saves hit the device's own request timeout while the
                // archive is still being assembled. Fall back, never retry.
                warn!(error = %e, "direct save failed, falling back to async task");
            }
        }
    }

    run_creation_task(client, config, &payload, cancel).await?;

    Ok(CreationReport {
        archive,
        elapsed: started.elapsed(),
        path: CreationPath::AsyncTask,
    })
}

/// Resolve the device's configured hostname.
pub async fn fetch_hostname(client: &dyn RestClient) -> ArchiveResult<String> {
    let settings = client
        .get_json(GLOBAL_SETTINGS_ENDPOINT, Some(HOSTNAME_QUERY))
        .await?;
    settings
        .get("hostname")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ArchiveError::MissingField {
            context: "hostname query",
            field: "hostname",
        })
}

/// Run the full async task lifecycle: create, start, poll, reconfirm, and
/// tear down.
async fn run_creation_task(
    client: &dyn RestClient,
    config: &DeviceConfig,
    payload: &Value,
    cancel: &CancellationToken,
) -> ArchiveResult<()> {
    let task = start_task(client, payload).await?;
    debug!(task_id = task.id(), "creation task started");

    poll_until_complete(client, config, &task, cancel).await?;
    confirm_result(client, &task).await?;

    // Result first, then the task itself; leaking either leaves an orphaned
    // job on the device.
    let outcome = delete_idempotent(client, &task.result_endpoint(), "task result").await?;
    debug!(task_id = task.id(), ?outcome, "task result deleted");
    let outcome = delete_idempotent(client, &task.endpoint(), "task").await?;
    debug!(task_id = task.id(), ?outcome, "task deleted");

    Ok(())
}

/// Create the task resource and start it, verifying the acknowledgment
/// phrase before any polling begins.
async fn start_task(client: &dyn RestClient, payload: &Value) -> ArchiveResult<AsyncTask> {
    let created = client.post_json(TASK_ENDPOINT, payload).await?;
    let task_id = match created.get("_taskId") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(ArchiveError::MissingField {
                context: "task creation",
                field: "_taskId",
            })
        }
    };
    let task = AsyncTask::new(task_id);

    let start_payload = json!({ "_taskState": TaskState::Validating.to_string() });
    let started = client.put_json(&task.endpoint(), &start_payload).await?;
    let message = started
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    if message != TASK_ACK_PHRASE {
        return Err(ArchiveError::UnexpectedResponse {
            context: "task start",
            detail: format!("expected {:?}, got {:?}", TASK_ACK_PHRASE, message),
        });
    }

    Ok(task)
}

/// Sleep-then-poll the task status until it reports `COMPLETED`.
///
/// The wait is cooperative: each interval races the cancellation token, and
/// the total wait is capped by the poll budget with a distinct timed-out
/// failure. A transport failure on any poll aborts immediately.
async fn poll_until_complete(
    client: &dyn RestClient,
    config: &DeviceConfig,
    task: &AsyncTask,
    cancel: &CancellationToken,
) -> ArchiveResult<()> {
    let endpoint = task.endpoint();
    let poll_started = tokio::time::Instant::now();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                return Err(ArchiveError::Cancelled {
                    task_id: task.id().to_string(),
                });
            }
            _ = tokio::time::sleep(config.poll_interval) => {}
        }

        if poll_started.elapsed() >= config.poll_budget {
            return Err(ArchiveError::PollTimedOut {
                task_id: task.id().to_string(),
                waited: poll_started.elapsed(),
            });
        }

        let status = client.get_json(&endpoint, None).await?;
        match status.get("_taskState").and_then(Value::as_str) {
            // The device occasionally answers with a bare reference object
            // mid-transition; treat that as "not yet".
            None => continue,
            Some(raw) => match TaskState::parse(raw) {
                Some(TaskState::Completed) => return Ok(()),
                Some(TaskState::Failed) => {
                    return Err(ArchiveError::TaskFailed {
                        task_id: task.id().to_string(),
                        state: raw.to_string(),
                    });
                }
                Some(state) => {
                    debug!(task_id = task.id(), %state, "task still running");
                }
                None => {
                    return Err(ArchiveError::UnexpectedResponse {
                        context: "task status poll",
                        detail: format!("unknown task state {:?}", raw),
                    });
                }
            },
        }
    }
}

/// Reconfirm completion through the result sub-resource.
async fn confirm_result(client: &dyn RestClient, task: &AsyncTask) -> ArchiveResult<()> {
    let result = client.get_json(&task.result_endpoint(), None).await?;
    match result.get("_taskState").and_then(Value::as_str) {
        Some(raw) if TaskState::parse(raw) == Some(TaskState::Completed) => Ok(()),
        other => Err(ArchiveError::UnexpectedResponse {
            context: "task result",
            detail: format!("result state was {:?}", other),
        }),
    }
}

/// DELETE a resource, mapping the device's already-deleted conflict
/// responses to an explicit outcome.
pub(crate) async fn delete_idempotent(
    client: &dyn RestClient,
    path: &str,
    resource: &'static str,
) -> ArchiveResult<DeleteOutcome> {
    let response = client.delete(path).await?;

    if response.is_success() {
        return Ok(DeleteOutcome::Deleted);
    }
    if response.status == 400 && is_already_deleted_body(&response.body) {
        return Ok(DeleteOutcome::AlreadyDeleted);
    }
    Err(ArchiveError::DeleteFailed {
        resource,
        status: response.status,
        body: response.body,
    })
}

/// Recognize the device's "already gone" conflict bodies.
///
/// The device races task teardown against client deletes and reports the
/// loser as HTTP 400 with a JSON body like
/// `{"code":400,"message":"Task not found - ID: 42185"}`.
fn is_already_deleted_body(body: &str) -> bool {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    if parsed.get("code").and_then(Value::as_i64) != Some(400) {
        return false;
    }
    let message = parsed
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default();
    message.contains("not found") || message.contains("deleted")
}
