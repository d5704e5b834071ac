use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use serde_json::{json, Value};

use super::traits::{OutputRendererPlugin, RenderEvent};
use super::types::{ExecutionOpts, ExecutionResult, Task, TaskId, TaskStatus};

/// One line of the JSONL event stream.
#[derive(Debug, Clone, Serialize)]
pub struct JsonlEvent {
    pub v: i32,
    #[serde(rename = "type")]
    pub event_type: String,
    pub ts: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl JsonlEvent {
    pub fn new(event_type: &str, run_id: &str) -> Self {
        Self {
            v: 1,
            event_type: event_type.to_string(),
            ts: Local::now().to_rfc3339(),
            run_id: run_id.to_string(),
            task_id: None,
            metadata: None,
        }
    }

    pub fn task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

pub fn emit_json(ev: &JsonlEvent) {
    if let Ok(line) = serde_json::to_string(ev) {
        println!("{line}");
    }
}

/// Routes render events to a plugin renderer, or to the built-in
/// JSONL/text output when none is installed.
#[derive(Clone)]
pub struct EventEmitter {
    opts: ExecutionOpts,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
}

impl EventEmitter {
    pub fn new(opts: ExecutionOpts, renderer: Option<Arc<dyn OutputRendererPlugin>>) -> Self {
        Self { opts, renderer }
    }

    pub fn emit(&self, event: RenderEvent) {
        match &self.renderer {
            Some(renderer) => renderer.render(&event),
            None => emit_default(&self.opts, &event),
        }
    }
}

fn emit_default(opts: &ExecutionOpts, event: &RenderEvent) {
    match event {
        RenderEvent::RunStart {
            run_id,
            total_tasks,
            total_batches,
        } => emit_run_start(opts, run_id, *total_tasks, *total_batches),
        RenderEvent::Plan { run_id, batches } => emit_execution_plan(opts, run_id, batches),
        RenderEvent::ValidationFailed { run_id, issues } => {
            emit_validation_failed(opts, run_id, issues)
        }
        RenderEvent::Fallback { run_id, reason } => emit_fallback(opts, run_id, reason),
        RenderEvent::BatchStart {
            run_id,
            batch_id,
            task_ids,
        } => emit_batch_start(opts, run_id, *batch_id, task_ids),
        RenderEvent::TaskStart {
            run_id,
            task_id,
            batch_id,
        } => emit_task_start(opts, run_id, *task_id, *batch_id),
        RenderEvent::TaskComplete { run_id, task } => emit_task_complete(opts, run_id, task),
        RenderEvent::BatchEnd { run_id, batch_id } => emit_batch_end(opts, run_id, *batch_id),
        RenderEvent::RunEnd { run_id, result } => emit_run_end(opts, run_id, result),
    }
}

/// Emit run start event
pub fn emit_run_start(opts: &ExecutionOpts, run_id: &str, total_tasks: usize, total_batches: usize) {
    if opts.is_jsonl() {
        emit_json(&JsonlEvent::new("run.start", run_id).metadata(json!({
            "total_tasks": total_tasks,
            "total_batches": total_batches,
        })));
    } else if !opts.quiet {
        println!(
            "🚀 Running {} tasks in {} batches (workers: {})",
            total_tasks, total_batches, opts.max_workers
        );
    }
}

/// Emit execution plan
pub fn emit_execution_plan(opts: &ExecutionOpts, run_id: &str, batches: &[Vec<TaskId>]) {
    if opts.is_jsonl() {
        let total_tasks: usize = batches.iter().map(|b| b.len()).sum();
        emit_json(&JsonlEvent::new("executor.plan", run_id).metadata(json!({
            "batches": batches,
            "total_tasks": total_tasks,
        })));
    } else if opts.verbose {
        println!("📋 Execution Plan:");
        for (i, batch) in batches.iter().enumerate() {
            println!("  Batch {}: {}", i, join_ids(batch));
        }
        println!();
    }
}

pub fn emit_validation_failed(opts: &ExecutionOpts, run_id: &str, issues: &[String]) {
    if opts.is_jsonl() {
        emit_json(
            &JsonlEvent::new("plan.rejected", run_id).metadata(json!({ "issues": issues })),
        );
    } else {
        eprintln!("❌ Plan rejected:");
        for issue in issues {
            eprintln!("  - {}", issue);
        }
    }
}

pub fn emit_fallback(opts: &ExecutionOpts, run_id: &str, reason: &str) {
    if opts.is_jsonl() {
        emit_json(
            &JsonlEvent::new("executor.fallback", run_id).metadata(json!({ "reason": reason })),
        );
    } else if !opts.quiet {
        eprintln!("⚠️  Falling back to sequential execution: {}", reason);
    }
}

/// Emit batch start event
pub fn emit_batch_start(opts: &ExecutionOpts, run_id: &str, batch_id: usize, task_ids: &[TaskId]) {
    if opts.is_jsonl() {
        emit_json(&JsonlEvent::new("batch.start", run_id).metadata(json!({
            "batch_id": batch_id,
            "tasks": task_ids,
        })));
    } else if opts.verbose && !opts.quiet {
        println!("▶ Batch {} ({} tasks)", batch_id, task_ids.len());
    }
}

/// Emit batch end event
pub fn emit_batch_end(opts: &ExecutionOpts, run_id: &str, batch_id: usize) {
    if opts.is_jsonl() {
        emit_json(
            &JsonlEvent::new("batch.end", run_id).metadata(json!({ "batch_id": batch_id })),
        );
    }
}

/// Emit task start event
pub fn emit_task_start(opts: &ExecutionOpts, run_id: &str, task_id: TaskId, batch_id: usize) {
    if opts.is_jsonl() {
        emit_json(
            &JsonlEvent::new("task.start", run_id)
                .task(task_id)
                .metadata(json!({ "batch_id": batch_id })),
        );
    } else if opts.verbose && !opts.quiet {
        println!("  ⏳ Starting task: {}", task_id);
    }
}

/// Emit task end event
pub fn emit_task_complete(opts: &ExecutionOpts, run_id: &str, task: &Task) {
    if opts.is_jsonl() {
        emit_json(
            &JsonlEvent::new("task.end", run_id)
                .task(task.id)
                .metadata(json!({
                    "status": task.status.as_str(),
                    "capability": task.capability,
                    "duration_ms": task.duration_ms,
                    "error": task.error.as_ref().map(|e| e.message.clone()),
                })),
        );
    } else if opts.verbose && !opts.quiet {
        let icon = status_icon(task.status);
        match &task.error {
            Some(err) => println!("  {} Task {}: {} ({})", icon, task.id, task.status.as_str(), err),
            None => println!("  {} Task {}: {}ms", icon, task.id, task.duration_ms),
        }
    }
}

/// Emit run end event
pub fn emit_run_end(opts: &ExecutionOpts, run_id: &str, result: &ExecutionResult) {
    if opts.is_jsonl() {
        emit_json(&JsonlEvent::new("run.end", run_id).metadata(json!({
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
        })));
    } else if !opts.quiet {
        let icon = if result.success { "✅" } else { "❌" };
        println!(
            "{} Completed {}/{} tasks in {}ms (failed: {}, skipped: {})",
            icon,
            result.completed(),
            result.total_tasks(),
            result.duration_ms,
            result.failed_task_ids.len(),
            result.skipped_task_ids.len()
        );
    }
}

pub fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "✅",
        TaskStatus::Failed => "❌",
        TaskStatus::Skipped => "⏭",
        TaskStatus::Pending | TaskStatus::Running => "⏳",
    }
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
