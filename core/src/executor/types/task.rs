use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExecutorError;

/// Task identifier, unique within a plan.
pub type TaskId = u32;

/// Opaque argument map handed to a capability.
pub type ArgMap = serde_json::Map<String, Value>;

/// Task specification as supplied by the caller (plan file / ad hoc call list).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub id: TaskId,

    #[serde(default)]
    pub description: String,

    pub capability: String,

    #[serde(default)]
    pub args: ArgMap,

    /// `None` means the dependencies were not declared at all; `Some(vec![])`
    /// explicitly declares none.
    #[serde(default, alias = "depends_on", skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<Vec<TaskId>>,

    #[serde(default, alias = "estimated_duration")]
    pub estimated_duration: u64,
}

impl TaskSpec {
    pub fn new(id: TaskId, capability: impl Into<String>) -> Self {
        Self {
            id,
            description: String::new(),
            capability: capability.into(),
            args: ArgMap::new(),
            depends_on: None,
            estimated_duration: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn depends_on(mut self, deps: impl IntoIterator<Item = TaskId>) -> Self {
        self.depends_on = Some(deps.into_iter().collect());
        self
    }

    pub fn with_estimate(mut self, estimated_duration: u64) -> Self {
        self.estimated_duration = estimated_duration;
        self
    }

    pub fn declares_dependencies(&self) -> bool {
        self.depends_on.is_some()
    }
}

/// Lifecycle of a task: `pending -> running -> {completed | failed | skipped}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Failed and skipped tasks both block their dependents.
    pub fn blocks_dependents(&self) -> bool {
        matches!(self, Self::Failed | Self::Skipped)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskErrorKind {
    Timeout,
    Capability,
    CapabilityUnavailable,
    DependencyFailed,
    Cancelled,
    /// Never started because an earlier batch ended with nothing runnable.
    Halted,
    Internal,
}

/// Structured error recorded on a failed or skipped task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskError {
    pub kind: TaskErrorKind,
    pub message: String,
}

impl TaskError {
    pub fn new(kind: TaskErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn dependency_failed(task_id: TaskId, blocked_by: &[TaskId]) -> Self {
        let ids: Vec<String> = blocked_by.iter().map(|id| id.to_string()).collect();
        Self::new(
            TaskErrorKind::DependencyFailed,
            format!("task {} skipped: dependency {} did not complete", task_id, ids.join(", ")),
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == TaskErrorKind::Timeout
    }
}

impl From<&ExecutorError> for TaskError {
    fn from(err: &ExecutorError) -> Self {
        let kind = match err {
            ExecutorError::Timeout { .. } => TaskErrorKind::Timeout,
            ExecutorError::Capability { .. } => TaskErrorKind::Capability,
            ExecutorError::CapabilityNotFound(_) => TaskErrorKind::CapabilityUnavailable,
            ExecutorError::Cancelled => TaskErrorKind::Cancelled,
            _ => TaskErrorKind::Internal,
        };
        Self::new(kind, err.to_string())
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A task inside a plan, including its execution record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    pub capability: String,
    pub args: ArgMap,
    pub depends_on: Vec<TaskId>,
    pub estimated_duration: u64,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    pub duration_ms: u64,
}

impl Task {
    pub fn from_spec(spec: &TaskSpec) -> Self {
        Self {
            id: spec.id,
            description: spec.description.clone(),
            capability: spec.capability.clone(),
            args: spec.args.clone(),
            depends_on: spec.depends_on.clone().unwrap_or_default(),
            estimated_duration: spec.estimated_duration,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn with_dependencies(mut self, deps: Vec<TaskId>) -> Self {
        self.depends_on = deps;
        self
    }

    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
    }

    pub fn mark_completed(&mut self, result: Value, duration_ms: u64) {
        self.status = TaskStatus::Completed;
        self.result = Some(result);
        self.error = None;
        self.duration_ms = duration_ms;
    }

    pub fn mark_failed(&mut self, error: TaskError, duration_ms: u64) {
        self.status = TaskStatus::Failed;
        self.result = None;
        self.error = Some(error);
        self.duration_ms = duration_ms;
    }

    pub fn mark_skipped(&mut self, error: TaskError) {
        self.status = TaskStatus::Skipped;
        self.result = None;
        self.error = Some(error);
    }

    /// Every string value found in the arguments, depth-first.
    pub fn arg_strings(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for value in self.args.values() {
            collect_strings(value, &mut out);
        }
        out
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Common task interface for graph construction.
pub trait TaskLike {
    fn id(&self) -> TaskId;
    fn dependencies(&self) -> &[TaskId];
}

impl TaskLike for Task {
    fn id(&self) -> TaskId {
        self.id
    }

    fn dependencies(&self) -> &[TaskId] {
        &self.depends_on
    }
}
