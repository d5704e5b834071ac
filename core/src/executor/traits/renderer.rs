use crate::executor::types::{ExecutionResult, Task, TaskId};

/// Output renderer plugin (controls output format)
pub trait OutputRendererPlugin: Send + Sync {
    fn name(&self) -> &str;
    fn format(&self) -> &str;
    fn render(&self, event: &RenderEvent);
}

/// Render events emitted by the execution engine
#[derive(Debug, Clone)]
pub enum RenderEvent {
    RunStart {
        run_id: String,
        total_tasks: usize,
        total_batches: usize,
    },
    Plan {
        run_id: String,
        batches: Vec<Vec<TaskId>>,
    },
    ValidationFailed {
        run_id: String,
        issues: Vec<String>,
    },
    Fallback {
        run_id: String,
        reason: String,
    },
    BatchStart {
        run_id: String,
        batch_id: usize,
        task_ids: Vec<TaskId>,
    },
    TaskStart {
        run_id: String,
        task_id: TaskId,
        batch_id: usize,
    },
    TaskComplete {
        run_id: String,
        task: Task,
    },
    BatchEnd {
        run_id: String,
        batch_id: usize,
    },
    RunEnd {
        run_id: String,
        result: ExecutionResult,
    },
}
