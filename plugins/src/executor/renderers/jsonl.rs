use chrono::Local;
use serde_json::{json, Value};
use taskweave_core::executor::traits::{OutputRendererPlugin, RenderEvent};

pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        match event {
            RenderEvent::RunStart {
                run_id,
                total_tasks,
                total_batches,
            } => envelope(
                "run.start",
                run_id,
                json!({ "total_tasks": total_tasks, "total_batches": total_batches }),
            ),
            RenderEvent::Plan { run_id, batches } => {
                let total_tasks: usize = batches.iter().map(|b| b.len()).sum();
                envelope(
                    "executor.plan",
                    run_id,
                    json!({ "batches": batches, "total_tasks": total_tasks }),
                )
            }
            RenderEvent::ValidationFailed { run_id, issues } => {
                envelope("plan.rejected", run_id, json!({ "issues": issues }))
            }
            RenderEvent::Fallback { run_id, reason } => {
                envelope("executor.fallback", run_id, json!({ "reason": reason }))
            }
            RenderEvent::BatchStart {
                run_id,
                batch_id,
                task_ids,
            } => envelope(
                "batch.start",
                run_id,
                json!({ "batch_id": batch_id, "tasks": task_ids }),
            ),
            RenderEvent::TaskStart {
                run_id,
                task_id,
                batch_id,
            } => {
                let mut value = envelope("task.start", run_id, json!({ "batch_id": batch_id }));
                value["task_id"] = json!(task_id);
                value
            }
            RenderEvent::TaskComplete { run_id, task } => {
                let mut value = envelope(
                    "task.end",
                    run_id,
                    json!({
                        "capability": task.capability,
                        "duration_ms": task.duration_ms,
                        "result": task.result,
                        "error": task.error,
                    }),
                );
                value["task_id"] = json!(task.id);
                value["status"] = json!(task.status.as_str());
                value
            }
            RenderEvent::BatchEnd { run_id, batch_id } => {
                envelope("batch.end", run_id, json!({ "batch_id": batch_id }))
            }
            RenderEvent::RunEnd { run_id, result } => envelope(
                "run.end",
                run_id,
                json!({
                    "success": result.success,
                    "total_tasks": result.total_tasks(),
                    "completed": result.completed(),
                    "failed": result.failed_task_ids,
                    "skipped": result.skipped_task_ids,
                    "batches_run": result.batches_run,
                    "halted_early": result.halted_early,
                    "fallback_used": result.fallback_used,
                    "cancelled": result.cancelled,
                    "duration_ms": result.duration_ms,
                }),
            ),
        }
    }
}

/// Common event fields; version 1 of the event schema.
fn envelope(event_type: &str, run_id: &str, metadata: Value) -> Value {
    json!({
        "v": 1,
        "event_type": event_type,
        "ts": Local::now().to_rfc3339(),
        "run_id": run_id,
        "metadata": metadata,
    })
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        if self.pretty_print {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".into()));
        } else {
            println!("{}", serde_json::to_string(&value).unwrap_or_else(|_| "{}".into()));
        }
    }
}
