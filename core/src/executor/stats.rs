//! Execution statistics: per-task timings and derived speedup figures.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

use super::types::{Task, TaskErrorKind, TaskId, TaskStatus};

/// Timing of one task inside a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskTiming {
    pub task_id: TaskId,
    pub capability: String,
    pub status: TaskStatus,
    pub duration_ms: u64,
    pub timed_out: bool,
}

impl TaskTiming {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.id,
            capability: task.capability.clone(),
            status: task.status,
            duration_ms: task.duration_ms,
            timed_out: task
                .error
                .as_ref()
                .map(|e| e.kind == TaskErrorKind::Timeout)
                .unwrap_or(false),
        }
    }
}

/// Everything recorded about one execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionRecord {
    pub run_id: String,
    pub tasks: Vec<TaskTiming>,
    /// Measured wall-clock time of the whole run
    pub wall_ms: u64,
    pub independent_count: usize,
    pub dependent_count: usize,
}

impl ExecutionRecord {
    /// Hypothetical fully-serial cost: the sum of individual task times
    pub fn serial_ms(&self) -> u64 {
        self.tasks.iter().map(|t| t.duration_ms).sum()
    }

    /// Serial cost divided by wall time (1.0 when nothing measurable ran)
    pub fn speedup(&self) -> f64 {
        let serial = self.serial_ms();
        if serial == 0 || self.wall_ms == 0 {
            return 1.0;
        }
        serial as f64 / self.wall_ms as f64
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapabilityTiming {
    pub count: u64,
    pub total_ms: u64,
    pub max_ms: u64,
    pub avg_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub total_executions: u64,
    pub total_tasks: u64,
    pub average_speedup: f64,
    pub per_capability_timings: BTreeMap<String, CapabilityTiming>,
    pub timeout_count: u64,
    pub error_count: u64,
    pub skipped_count: u64,
    pub independent_count: u64,
    pub dependent_count: u64,
}

#[derive(Debug, Default)]
struct StatsInner {
    total_executions: u64,
    total_tasks: u64,
    speedup_sum: f64,
    per_capability: BTreeMap<String, CapabilityTiming>,
    timeout_count: u64,
    error_count: u64,
    skipped_count: u64,
    independent_count: u64,
    dependent_count: u64,
}

/// Additive aggregate over every recorded execution.
#[derive(Debug, Default)]
pub struct ExecutionStats {
    inner: Mutex<StatsInner>,
}

impl ExecutionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, record: &ExecutionRecord) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        inner.total_executions += 1;
        inner.total_tasks += record.tasks.len() as u64;
        inner.speedup_sum += record.speedup();
        inner.independent_count += record.independent_count as u64;
        inner.dependent_count += record.dependent_count as u64;

        for timing in &record.tasks {
            match timing.status {
                TaskStatus::Skipped => {
                    inner.skipped_count += 1;
                    continue;
                }
                TaskStatus::Failed if timing.timed_out => inner.timeout_count += 1,
                TaskStatus::Failed => inner.error_count += 1,
                _ => {}
            }

            let entry = inner
                .per_capability
                .entry(timing.capability.clone())
                .or_default();
            entry.count += 1;
            entry.total_ms += timing.duration_ms;
            entry.max_ms = entry.max_ms.max(timing.duration_ms);
            entry.avg_ms = entry.total_ms as f64 / entry.count as f64;
        }
    }

    pub fn get_stats(&self) -> StatsSnapshot {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let average_speedup = if inner.total_executions == 0 {
            0.0
        } else {
            inner.speedup_sum / inner.total_executions as f64
        };

        StatsSnapshot {
            total_executions: inner.total_executions,
            total_tasks: inner.total_tasks,
            average_speedup,
            per_capability_timings: inner.per_capability.clone(),
            timeout_count: inner.timeout_count,
            error_count: inner.error_count,
            skipped_count: inner.skipped_count,
            independent_count: inner.independent_count,
            dependent_count: inner.dependent_count,
        }
    }

    pub fn reset(&self) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = StatsInner::default();
    }
}
