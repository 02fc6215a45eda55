//! Async creation task model.
//!
//! The appliance tracks long-running archive creation as a task resource
//! with `create → start → poll → result → delete` sub-resources. States are
//! reported as uppercase strings in the `_taskState` field.

/// REST endpoint for async archive-creation tasks.
pub const TASK_ENDPOINT: &str = "/mgmt/tm/task/sys/ucs";

/// Acknowledgment phrase the device must return when a task is started.
///
/// Anything else in the start response's `message` field means the task is
/// not actually running and polling would never terminate.
pub const TASK_ACK_PHRASE: &str = "Task will execute asynchronously.";

/// Lifecycle state of an async creation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Validating,
    Executing,
    Completed,
    Failed,
}

impl TaskState {
    /// Parse a `_taskState` value. The device reports uppercase but parsing
    /// is case-insensitive; unknown strings return `None` so callers can
    /// treat them as a protocol mismatch rather than guessing.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "CREATED" => Some(Self::Created),
            "VALIDATING" => Some(Self::Validating),
            "EXECUTING" => Some(Self::Executing),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// True once the task has reached a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Validating => "VALIDATING",
            Self::Executing => "EXECUTING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Handle to one server-side creation task.
#[derive(Debug, Clone)]
pub struct AsyncTask {
    id: String,
}

impl AsyncTask {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Path of the task resource itself.
    pub fn endpoint(&self) -> String {
        format!("{}/{}", TASK_ENDPOINT, self.id)
    }

    /// Path of the task's result sub-resource.
    pub fn result_endpoint(&self) -> String {
        format!("{}/{}/result", TASK_ENDPOINT, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_states() {
        assert_eq!(TaskState::parse("VALIDATING"), Some(TaskState::Validating));
        assert_eq!(TaskState::parse("completed"), Some(TaskState::Completed));
        assert_eq!(TaskState::parse("Executing"), Some(TaskState::Executing));
    }

    #[test]
    fn test_parse_unknown_state() {
        assert_eq!(TaskState::parse("EXPLODED"), None);
        assert_eq!(TaskState::parse(""), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(TaskState::Completed.is_terminal());
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::Executing.is_terminal());
        assert!(!TaskState::Validating.is_terminal());
    }

    #[test]
    fn test_task_endpoints() {
        let task = AsyncTask::new("42185");
        assert_eq!(task.endpoint(), "/mgmt/tm/task/sys/ucs/42185");
        assert_eq!(task.result_endpoint(), "/mgmt/tm/task/sys/ucs/42185/result");
    }
}
