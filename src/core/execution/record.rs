use serde::Serialize;
use serde_json::Value;

use crate::core::api::{ExecutionReport, RemoteStatus};

/// Detail recorded when the status channel itself fails.
pub const POLL_FAILURE_DETAIL: &str = "Failed to poll status.";

const REMOTE_FAILURE_FALLBACK: &str = "Execution failed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    NotStarted,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::NotStarted => "NOT_STARTED",
            ExecutionStatus::Running => "RUNNING",
            ExecutionStatus::Completed => "COMPLETED",
            ExecutionStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Failed)
    }
}

impl From<RemoteStatus> for ExecutionStatus {
    fn from(status: RemoteStatus) -> Self {
        match status {
            RemoteStatus::Running => ExecutionStatus::Running,
            RemoteStatus::Completed => ExecutionStatus::Completed,
            RemoteStatus::Failed => ExecutionStatus::Failed,
        }
    }
}

pub fn can_transition(from: ExecutionStatus, to: ExecutionStatus) -> bool {
    match from {
        ExecutionStatus::NotStarted => {
            matches!(to, ExecutionStatus::NotStarted | ExecutionStatus::Running)
        }
        ExecutionStatus::Running => matches!(
            to,
            ExecutionStatus::Running | ExecutionStatus::Completed | ExecutionStatus::Failed
        ),
        ExecutionStatus::Completed | ExecutionStatus::Failed => false,
    }
}

/// Tracked state of one kickoff attempt for a crew.
///
/// Fields are private so the status/result/error pairing can only change
/// through the transitions below: `result` exists only for `COMPLETED`,
/// `error_detail` only for `FAILED`, `launch_error` only for `NOT_STARTED`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRecord {
    execution_id: Option<String>,
    status: ExecutionStatus,
    result: Option<Value>,
    error_detail: Option<String>,
    launch_error: Option<String>,
    raw_input_text: String,
}

impl ExecutionRecord {
    pub fn draft(raw_input_text: &str) -> Self {
        Self {
            execution_id: None,
            status: ExecutionStatus::NotStarted,
            result: None,
            error_detail: None,
            launch_error: None,
            raw_input_text: raw_input_text.to_string(),
        }
    }

    pub fn running(execution_id: &str, raw_input_text: &str) -> Self {
        Self {
            execution_id: Some(execution_id.to_string()),
            status: ExecutionStatus::Running,
            ..Self::draft(raw_input_text)
        }
    }

    pub fn launch_failed(raw_input_text: &str, detail: &str) -> Self {
        Self {
            launch_error: Some(detail.to_string()),
            ..Self::draft(raw_input_text)
        }
    }

    pub fn execution_id(&self) -> Option<&str> {
        self.execution_id.as_deref()
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }

    pub fn launch_error(&self) -> Option<&str> {
        self.launch_error.as_deref()
    }

    pub fn raw_input_text(&self) -> &str {
        &self.raw_input_text
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    pub(crate) fn set_raw_input_text(&mut self, text: &str) {
        self.raw_input_text = text.to_string();
    }

    /// Fold one poll response into the record. Returns true once terminal.
    pub(crate) fn apply_report(&mut self, report: &ExecutionReport) -> bool {
        let next = ExecutionStatus::from(report.status);
        if !can_transition(self.status, next) {
            return self.is_terminal();
        }
        match report.status {
            RemoteStatus::Running => {
                self.status = ExecutionStatus::Running;
                self.result = None;
                self.error_detail = None;
            }
            RemoteStatus::Completed => {
                self.status = ExecutionStatus::Completed;
                self.result = Some(report.result.clone());
                self.error_detail = None;
            }
            RemoteStatus::Failed => self.fail(&failure_detail(&report.result)),
        }
        self.is_terminal()
    }

    pub(crate) fn fail_polling(&mut self) {
        if can_transition(self.status, ExecutionStatus::Failed) {
            self.fail(POLL_FAILURE_DETAIL);
        }
    }

    fn fail(&mut self, detail: &str) {
        self.status = ExecutionStatus::Failed;
        self.result = None;
        self.error_detail = Some(detail.to_string());
    }
}

/// Human-readable cause from a remote failure payload.
pub fn failure_detail(result: &Value) -> String {
    match result {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Null | Value::String(_) => REMOTE_FAILURE_FALLBACK.to_string(),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("detail"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| result.to_string()),
        other => other.to_string(),
    }
}
