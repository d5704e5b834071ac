use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::task::{Task, TaskError, TaskId, TaskStatus};

/// Per-task entry of the result map: either a value or a structured error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutcome {
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
    pub duration_ms: u64,
}

impl TaskOutcome {
    pub fn from_task(task: &Task) -> Self {
        Self {
            status: task.status,
            value: task.result.clone(),
            error: task.error.clone(),
            duration_ms: task.duration_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Result of running a plan or a set of ad hoc calls.
///
/// Always produced, even under total failure: validation problems surface in
/// `validation_issues`, task failures in `failed_task_ids`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub run_id: String,

    /// Entries for every task that reached a terminal state.
    pub results: BTreeMap<TaskId, TaskOutcome>,

    pub success: bool,

    pub failed_task_ids: Vec<TaskId>,

    pub skipped_task_ids: Vec<TaskId>,

    /// Present only when the plan was rejected before execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_issues: Option<Vec<String>>,

    /// Batches as scheduled (for debugging).
    pub batches: Vec<Vec<TaskId>>,

    /// Number of batches that actually ran.
    pub batches_run: usize,

    /// True when execution stopped before the last batch.
    pub halted_early: bool,

    /// True when scheduling failed and tasks ran sequentially instead.
    pub fallback_used: bool,

    pub cancelled: bool,

    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Result for a plan that failed validation: nothing ran.
    pub fn rejected(run_id: &str, issues: Vec<String>) -> Self {
        Self {
            run_id: run_id.to_string(),
            success: false,
            validation_issues: Some(issues),
            ..Default::default()
        }
    }

    pub fn total_tasks(&self) -> usize {
        self.results.len()
    }

    pub fn completed(&self) -> usize {
        self.results.values().filter(|o| o.is_success()).count()
    }

    pub fn value(&self, id: TaskId) -> Option<&Value> {
        self.results.get(&id).and_then(|o| o.value.as_ref())
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.results.get(&id).map(|o| o.status)
    }
}
