use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinError;

use crate::error::ExecutorError;

use super::args::{referenced_tasks, resolve_args};
use super::output::EventEmitter;
use super::progress::ProgressMonitor;
use super::registry::CapabilityRegistry;
use super::traits::RenderEvent;
use super::types::{Task, TaskError, TaskErrorKind, TaskId, TaskStatus};

/// Invoked synchronously after each task reaches a terminal state.
pub type ProgressCallback = Arc<dyn Fn(&Task) + Send + Sync>;

/// Terminal tasks of one run plus the values later tasks may reference.
#[derive(Debug, Default)]
pub struct RunState {
    tasks: BTreeMap<TaskId, Task>,
    values: HashMap<TaskId, Value>,
}

impl RunState {
    pub fn record(&mut self, task: Task) {
        if let Some(value) = &task.result {
            self.values.insert(task.id, value.clone());
        }
        self.tasks.insert(task.id, task);
    }

    pub fn status(&self, task_id: TaskId) -> Option<TaskStatus> {
        self.tasks.get(&task_id).map(|t| t.status)
    }

    /// Dependencies that ended failed or skipped
    pub fn blocked_by(&self, deps: &[TaskId]) -> Vec<TaskId> {
        deps.iter()
            .filter(|dep| {
                self.status(**dep)
                    .map(|s| s.blocks_dependents())
                    .unwrap_or(false)
            })
            .copied()
            .collect()
    }

    /// Copy of the values for `ids` that exist
    pub fn snapshot(&self, ids: &[TaskId]) -> HashMap<TaskId, Value> {
        ids.iter()
            .filter_map(|id| self.values.get(id).map(|v| (*id, v.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn into_tasks(self) -> BTreeMap<TaskId, Task> {
        self.tasks
    }
}

pub type SharedState = Arc<Mutex<RunState>>;

/// Lock the shared state. Workers never panic while holding it, so a
/// poisoned lock still carries consistent data.
pub fn lock_state(state: &SharedState) -> MutexGuard<'_, RunState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Everything a worker needs to run one task of a run.
pub struct TaskRunner {
    pub run_id: String,
    pub registry: CapabilityRegistry,
    pub task_timeout: Duration,
    pub events: EventEmitter,
    pub state: SharedState,
    pub progress: Option<ProgressCallback>,
    pub monitor: Arc<Mutex<ProgressMonitor>>,
}

impl TaskRunner {
    /// Run a single task to a terminal state and record it.
    pub async fn execute(&self, mut task: Task, batch_id: usize) -> Task {
        let refs = referenced_tasks(&task.args);
        let (blocked, snapshot) = {
            let state = lock_state(&self.state);
            (state.blocked_by(&task.depends_on), state.snapshot(&refs))
        };

        if !blocked.is_empty() {
            tracing::debug!(task_id = task.id, ?blocked, "skipping task");
            task.mark_skipped(TaskError::dependency_failed(task.id, &blocked));
            self.finish(&task);
            return task;
        }

        task.mark_running();
        self.events.emit(RenderEvent::TaskStart {
            run_id: self.run_id.clone(),
            task_id: task.id,
            batch_id,
        });
        if let Ok(mut monitor) = self.monitor.lock() {
            monitor.start_task(&task);
        }

        let args = resolve_args(&task.args, &snapshot);
        let start = Instant::now();

        let outcome = match self.registry.get(&task.capability) {
            None => Err(ExecutorError::CapabilityNotFound(task.capability.clone())),
            Some(capability) => {
                match tokio::time::timeout(self.task_timeout, capability.invoke(&args)).await {
                    Ok(Ok(value)) => Ok(value),
                    Ok(Err(e)) => Err(ExecutorError::Capability {
                        task_id: task.id,
                        message: e.to_string(),
                    }),
                    Err(_) => Err(ExecutorError::Timeout {
                        task_id: task.id,
                        timeout_ms: self.task_timeout.as_millis() as u64,
                    }),
                }
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(value) => {
                tracing::debug!(task_id = task.id, duration_ms, "task completed");
                task.mark_completed(value, duration_ms);
            }
            Err(err) => {
                if matches!(err, ExecutorError::Timeout { .. }) {
                    tracing::warn!(task_id = task.id, "{}", err);
                } else {
                    tracing::debug!(task_id = task.id, "{}", err);
                }
                task.mark_failed(TaskError::from(&err), duration_ms);
            }
        }

        self.finish(&task);
        task
    }

    /// Record a terminal task and notify listeners.
    pub fn finish(&self, task: &Task) {
        lock_state(&self.state).record(task.clone());

        self.events.emit(RenderEvent::TaskComplete {
            run_id: self.run_id.clone(),
            task: task.clone(),
        });
        if let Ok(mut monitor) = self.monitor.lock() {
            monitor.finish_task(task);
        }
        if let Some(callback) = &self.progress {
            callback(task);
        }
    }
}

/// Execute one batch of tasks in parallel
///
/// Every task gets its own tokio task so a panicking capability is contained
/// to that task. At most `max_workers` invocations run at once. Returns when
/// the whole batch has drained, in completion order.
pub async fn execute_batch_parallel(
    runner: Arc<TaskRunner>,
    tasks: Vec<Task>,
    batch_id: usize,
    max_workers: usize,
) -> Vec<Task> {
    let sem = Arc::new(Semaphore::new(max_workers.max(1)));
    let mut futs = FuturesUnordered::new();

    for task in tasks {
        let sem = sem.clone();
        let worker = runner.clone();
        let original = task.clone();

        let handle = tokio::spawn(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let mut task = task;
                    task.mark_failed(
                        TaskError::new(TaskErrorKind::Internal, "worker pool closed unexpectedly"),
                        0,
                    );
                    worker.finish(&task);
                    return task;
                }
            };

            worker.execute(task, batch_id).await
        });

        futs.push(async move { (original, handle.await) });
    }

    let mut finished = Vec::new();

    while let Some((original, joined)) = futs.next().await {
        match joined {
            Ok(task) => finished.push(task),
            Err(err) => {
                let message = join_error_message(err);
                tracing::error!(task_id = original.id, "worker panicked: {}", message);

                let mut task = original;
                task.mark_failed(
                    TaskError::new(
                        TaskErrorKind::Internal,
                        format!("task {} panicked: {}", task.id, message),
                    ),
                    0,
                );
                runner.finish(&task);
                finished.push(task);
            }
        }
    }

    finished
}

fn join_error_message(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
