use taskweave_core::executor::traits::{OutputRendererPlugin, RenderEvent};
use taskweave_core::executor::types::{TaskId, TaskStatus};

pub struct TextRendererPlugin {
    ascii_only: bool,
}

impl TextRendererPlugin {
    pub fn new(ascii_only: bool) -> Self {
        Self { ascii_only }
    }

    fn status_label(&self, status: TaskStatus) -> &'static str {
        match (status, self.ascii_only) {
            (TaskStatus::Completed, true) => "OK",
            (TaskStatus::Completed, false) => "SUCCESS",
            (TaskStatus::Failed, true) => "FAIL",
            (TaskStatus::Failed, false) => "FAILED",
            (TaskStatus::Skipped, true) => "SKIP",
            (TaskStatus::Skipped, false) => "SKIPPED",
            (TaskStatus::Pending | TaskStatus::Running, _) => "PENDING",
        }
    }

    fn format_event(&self, event: &RenderEvent) -> String {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_tasks,
                total_batches,
            } => format!(
                "RUN START {} (tasks: {}, batches: {})",
                run_id, total_tasks, total_batches
            ),
            RenderEvent::Plan { run_id, batches } => {
                let mut out = format!("PLAN {}:", run_id);
                for (idx, batch) in batches.iter().enumerate() {
                    out.push_str(&format!("\n  batch {}: {}", idx, join_ids(batch)));
                }
                out
            }
            RenderEvent::ValidationFailed { run_id, issues } => {
                let mut out = format!("PLAN REJECTED {} ({} issues)", run_id, issues.len());
                for issue in issues {
                    out.push_str(&format!("\n  - {}", issue));
                }
                out
            }
            RenderEvent::Fallback { run_id, reason } => {
                format!("FALLBACK {} (sequential): {}", run_id, reason)
            }
            RenderEvent::BatchStart {
                run_id,
                batch_id,
                task_ids,
            } => format!(
                "BATCH START {} (batch {}, tasks: {})",
                run_id,
                batch_id,
                join_ids(task_ids)
            ),
            RenderEvent::TaskStart {
                run_id,
                task_id,
                batch_id,
            } => format!(
                "TASK START {} (batch {}, task {})",
                run_id, batch_id, task_id
            ),
            RenderEvent::TaskComplete { run_id, task } => {
                let mut line = format!(
                    "TASK END {} (task {}, {}, status {}, duration {}ms)",
                    run_id,
                    task.id,
                    task.capability,
                    self.status_label(task.status),
                    task.duration_ms
                );
                if let Some(err) = &task.error {
                    line.push_str(&format!(": {}", err.message));
                }
                line
            }
            RenderEvent::BatchEnd { run_id, batch_id } => {
                format!("BATCH END {} (batch {})", run_id, batch_id)
            }
            RenderEvent::RunEnd { run_id, result } => {
                let mut line = format!(
                    "RUN END {} (completed {}, failed {}, skipped {}, batches {}, duration {}ms)",
                    run_id,
                    result.completed(),
                    result.failed_task_ids.len(),
                    result.skipped_task_ids.len(),
                    result.batches_run,
                    result.duration_ms
                );
                if result.halted_early {
                    line.push_str(" [halted]");
                }
                if result.fallback_used {
                    line.push_str(" [sequential]");
                }
                if result.cancelled {
                    line.push_str(" [cancelled]");
                }
                line
            }
        }
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl OutputRendererPlugin for TextRendererPlugin {
    fn name(&self) -> &str {
        "text-renderer"
    }

    fn format(&self) -> &str {
        "text"
    }

    fn render(&self, event: &RenderEvent) {
        println!("{}", self.format_event(event));
    }
}
