use super::Meeting;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Response of the sync trigger endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncTask {
    pub task_id: String,
}

/// Celery task states as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskState {
    Pending,
    Started,
    Retry,
    Progress,
    Success,
    Failure,
    Unknown(String),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Started => "STARTED",
            Self::Retry => "RETRY",
            Self::Progress => "PROGRESS",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Unknown(s) => s,
        }
    }
}

impl From<String> for TaskState {
    fn from(value: String) -> Self {
        match value.to_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "STARTED" => Self::Started,
            "RETRY" => Self::Retry,
            "PROGRESS" => Self::Progress,
            "SUCCESS" => Self::Success,
            "FAILURE" => Self::Failure,
            _ => Self::Unknown(value),
        }
    }
}

impl From<TaskState> for String {
    fn from(state: TaskState) -> Self {
        state.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(alias = "state")]
    pub status: TaskState,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskStatus {
    pub fn new(status: TaskState) -> Self {
        Self {
            status,
            result: None,
            error: None,
        }
    }

    /// Message to show when the task failed.
    pub fn failure_message(&self) -> String {
        if let Some(error) = &self.error {
            return error.clone();
        }
        match &self.result {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Object(map)) => map
                .get("error")
                .or_else(|| map.get("detail"))
                .and_then(Value::as_str)
                .unwrap_or("Sync failed")
                .to_string(),
            _ => "Sync failed".to_string(),
        }
    }
}

/// How a sync run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Task succeeded and the meeting list was re-fetched once.
    Completed {
        task_id: String,
        polls: u32,
        /// Meeting list fetched after the task succeeded.
        refreshed: Vec<Meeting>,
    },
    Failed {
        task_id: String,
        message: String,
    },
    TimedOut {
        task_id: String,
        polls: u32,
        elapsed: Duration,
    },
    Cancelled {
        task_id: String,
        polls: u32,
    },
}

impl SyncOutcome {
    pub fn task_id(&self) -> &str {
        match self {
            Self::Completed { task_id, .. }
            | Self::Failed { task_id, .. }
            | Self::TimedOut { task_id, .. }
            | Self::Cancelled { task_id, .. } => task_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Banner text for the dashboard, `None` on success.
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { message, .. } => Some(message.clone()),
            Self::TimedOut { .. } => {
                Some("Sync is taking longer than expected. Please check back in a few minutes.".to_string())
            }
            Self::Cancelled { .. } => Some("Sync was cancelled.".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_status_parsing() {
        let status: TaskStatus = serde_json::from_value(json!({ "status": "SUCCESS" })).unwrap();
        assert_eq!(status.status, TaskState::Success);
        assert!(status.status.is_terminal());

        let status: TaskStatus = serde_json::from_value(json!({ "state": "pending" })).unwrap();
        assert_eq!(status.status, TaskState::Pending);
        assert!(!status.status.is_terminal());

        let status: TaskStatus = serde_json::from_value(json!({ "status": "REVOKED" })).unwrap();
        assert_eq!(status.status, TaskState::Unknown("REVOKED".to_string()));
    }

    #[test]
    fn test_failure_message_sources() {
        let status: TaskStatus =
            serde_json::from_value(json!({ "status": "FAILURE", "error": "Fireflies token expired" })).unwrap();
        assert_eq!(status.failure_message(), "Fireflies token expired");

        let status: TaskStatus =
            serde_json::from_value(json!({ "status": "FAILURE", "result": { "detail": "Zoom API down" } })).unwrap();
        assert_eq!(status.failure_message(), "Zoom API down");

        assert_eq!(TaskStatus::new(TaskState::Failure).failure_message(), "Sync failed");
    }

    #[test]
    fn test_outcome_messages() {
        let done = SyncOutcome::Completed { task_id: "t1".into(), polls: 3, refreshed: vec![] };
        assert!(done.is_success());
        assert!(done.error_message().is_none());

        let failed = SyncOutcome::Failed { task_id: "t2".into(), message: "boom".into() };
        assert_eq!(failed.error_message().as_deref(), Some("boom"));
        assert_eq!(failed.task_id(), "t2");
    }
}
