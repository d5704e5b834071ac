use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use uuid::Uuid;

use crate::error::ExecutorError;

use super::cancel::CancelSignal;
use super::graph::TaskGraph;
use super::inference::DependencyInferencer;
use super::output::EventEmitter;
use super::planner::Planner;
use super::progress::ProgressMonitor;
use super::registry::CapabilityRegistry;
use super::scheduler::{
    execute_batch_parallel, lock_state, ProgressCallback, SharedState, TaskRunner,
};
use super::stats::{ExecutionRecord, ExecutionStats, TaskTiming};
use super::traits::{OutputRendererPlugin, RenderEvent};
use super::types::{
    ExecutionOpts, ExecutionResult, Plan, PlanInput, Task, TaskError, TaskErrorKind, TaskId,
    TaskOutcome, TaskSpec, TaskStatus,
};
use super::validator::{PlanValidator, ValidationReport};

/// True when at least one task remains and each remaining task depends,
/// directly or through other remaining tasks, on a failed or skipped task.
fn remaining_all_blocked(
    state: &SharedState,
    pending: &HashMap<TaskId, Task>,
    remaining: &[Vec<TaskId>],
) -> bool {
    let state = lock_state(state);
    let mut doomed: HashSet<TaskId> = HashSet::new();
    let mut any = false;
    for id in remaining.iter().flatten() {
        let Some(task) = pending.get(id) else {
            continue;
        };
        any = true;
        let blocked = task.depends_on.iter().any(|dep| {
            doomed.contains(dep)
                || state
                    .status(*dep)
                    .map(|s| s.blocks_dependents())
                    .unwrap_or(false)
        });
        if !blocked {
            return false;
        }
        doomed.insert(*id);
    }
    any
}

/// A fully decided run: tasks with their final edges plus batch order.
struct Schedule {
    run_id: String,
    tasks: Vec<Task>,
    batches: Vec<Vec<TaskId>>,
    independent_count: usize,
    dependent_count: usize,
    fallback_used: bool,
}

/// Execution engine for task dependency graphs
///
/// Every `run_*` entry point returns an [`ExecutionResult`]; failures of any
/// kind are recorded in it rather than returned as errors.
pub struct ExecutionEngine {
    registry: CapabilityRegistry,
    opts: ExecutionOpts,
    inferencer: Arc<DependencyInferencer>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    stats: Arc<ExecutionStats>,
    progress: Option<ProgressCallback>,
    cancel: CancelSignal,
}

pub struct ExecutionEngineBuilder {
    registry: CapabilityRegistry,
    opts: ExecutionOpts,
    inferencer: Option<Arc<DependencyInferencer>>,
    renderer: Option<Arc<dyn OutputRendererPlugin>>,
    stats: Option<Arc<ExecutionStats>>,
    progress: Option<ProgressCallback>,
    cancel: Option<CancelSignal>,
}

impl ExecutionEngine {
    pub fn new(registry: CapabilityRegistry, opts: ExecutionOpts) -> Self {
        ExecutionEngineBuilder::new(registry, opts).build()
    }

    pub fn builder(registry: CapabilityRegistry, opts: ExecutionOpts) -> ExecutionEngineBuilder {
        ExecutionEngineBuilder::new(registry, opts)
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    pub fn opts(&self) -> &ExecutionOpts {
        &self.opts
    }

    pub fn inferencer(&self) -> &DependencyInferencer {
        &self.inferencer
    }

    pub fn stats(&self) -> &Arc<ExecutionStats> {
        &self.stats
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.cancel.clone()
    }

    /// Read-only plan validation against this engine's registry.
    pub fn validate(&self, plan: &Plan) -> ValidationReport {
        PlanValidator::new(&self.registry).validate(plan)
    }

    /// Strict topological batches of a plan.
    pub fn schedule(&self, plan: &Plan) -> Result<Vec<Vec<TaskId>>, ExecutorError> {
        TaskGraph::from_tasks(&plan.tasks).topological_sort()
    }

    pub fn build_plan(&self, input: &PlanInput) -> Result<Plan, ExecutorError> {
        Planner::new(&self.inferencer).build(input, self.opts.dependency_mode)
    }

    /// Build a plan from raw input and run it.
    ///
    /// When dependency inference fails the declared edges are validated
    /// and the tasks run sequentially instead.
    pub async fn run_input(&self, input: &PlanInput) -> ExecutionResult {
        match self.build_plan(input) {
            Ok(plan) => self.run_plan(&plan).await,
            Err(err) => {
                let run_id = Uuid::new_v4().to_string();
                let tasks: Vec<Task> = input.tasks.iter().map(Task::from_spec).collect();
                let report = PlanValidator::new(&self.registry).validate_tasks(&tasks);
                if !report.valid {
                    return self.reject(&run_id, report.messages());
                }
                self.fallback(run_id, tasks, err).await
            }
        }
    }

    /// Validate, batch and execute a plan.
    pub async fn run_plan(&self, plan: &Plan) -> ExecutionResult {
        let run_id = plan.id.clone();

        let report = self.validate(plan);
        if !report.valid {
            return self.reject(&run_id, report.messages());
        }

        let graph = TaskGraph::from_tasks(&plan.tasks);
        match graph.topological_sort() {
            Ok(batches) => {
                let (independent_count, dependent_count) = independence_counts(&graph);
                self.execute(Schedule {
                    run_id,
                    tasks: plan.tasks.clone(),
                    batches,
                    independent_count,
                    dependent_count,
                    fallback_used: false,
                })
                .await
            }
            Err(err) => self.fallback(run_id, plan.tasks.clone(), err).await,
        }
    }

    /// Run ad hoc calls whose dependencies are inferred.
    ///
    /// Provably independent calls share the first batch; every other call
    /// gets its own batch in submission order.
    pub async fn run_calls(&self, specs: &[TaskSpec]) -> ExecutionResult {
        let run_id = Uuid::new_v4().to_string();
        let tasks: Vec<Task> = specs
            .iter()
            .map(|spec| Task::from_spec(spec).with_dependencies(Vec::new()))
            .collect();

        let report = PlanValidator::new(&self.registry).validate_tasks(&tasks);
        if !report.valid {
            return self.reject(&run_id, report.messages());
        }

        let partition = match self.inferencer.partition(&tasks) {
            Ok(partition) => partition,
            Err(err) => return self.fallback(run_id, tasks, err).await,
        };

        let tasks: Vec<Task> = tasks
            .into_iter()
            .map(|task| {
                let deps = partition.dependencies(task.id).to_vec();
                task.with_dependencies(deps)
            })
            .collect();

        let mut batches = Vec::with_capacity(partition.dependent.len() + 1);
        if !partition.independent.is_empty() {
            batches.push(partition.independent.clone());
        }
        batches.extend(partition.dependent.iter().map(|id| vec![*id]));

        self.execute(Schedule {
            run_id,
            tasks,
            batches,
            independent_count: partition.independent.len(),
            dependent_count: partition.dependent.len(),
            fallback_used: false,
        })
        .await
    }

    /// Execute precomputed batches. Task dependencies still drive skipping.
    pub async fn run_batches(&self, tasks: Vec<Task>, batches: Vec<Vec<TaskId>>) -> ExecutionResult {
        let graph = TaskGraph::from_tasks(&tasks);
        let (independent_count, dependent_count) = independence_counts(&graph);
        self.execute(Schedule {
            run_id: Uuid::new_v4().to_string(),
            tasks,
            batches,
            independent_count,
            dependent_count,
            fallback_used: false,
        })
        .await
    }

    /// One task per batch, in submission order.
    pub async fn run_sequential(&self, tasks: Vec<Task>) -> ExecutionResult {
        let run_id = Uuid::new_v4().to_string();
        self.execute(sequential_schedule(run_id, tasks)).await
    }

    async fn fallback(&self, run_id: String, tasks: Vec<Task>, err: ExecutorError) -> ExecutionResult {
        let events = self.events();

        if !self.opts.sequential_fallback {
            tracing::error!(run_id = %run_id, "scheduling failed: {}", err);
            return self.fail_all(&run_id, tasks, &err);
        }

        let reason = match err {
            ExecutorError::SchedulingFallback(reason) => reason,
            other => other.to_string(),
        };
        tracing::warn!(run_id = %run_id, "falling back to sequential execution: {}", reason);
        events.emit(RenderEvent::Fallback {
            run_id: run_id.clone(),
            reason,
        });

        self.execute(sequential_schedule(run_id, tasks)).await
    }

    fn reject(&self, run_id: &str, issues: Vec<String>) -> ExecutionResult {
        tracing::info!(run_id = %run_id, issues = issues.len(), "plan rejected");
        let events = self.events();
        events.emit(RenderEvent::ValidationFailed {
            run_id: run_id.to_string(),
            issues: issues.clone(),
        });

        let result = ExecutionResult::rejected(run_id, issues);
        events.emit(RenderEvent::RunEnd {
            run_id: run_id.to_string(),
            result: result.clone(),
        });
        result
    }

    fn fail_all(&self, run_id: &str, tasks: Vec<Task>, err: &ExecutorError) -> ExecutionResult {
        let mut finished = BTreeMap::new();
        for mut task in tasks {
            task.mark_failed(TaskError::new(TaskErrorKind::Internal, err.to_string()), 0);
            finished.insert(task.id, task);
        }

        let mut result = ExecutionResult {
            run_id: run_id.to_string(),
            ..Default::default()
        };
        fill_outcomes(&mut result, &finished);

        self.events().emit(RenderEvent::RunEnd {
            run_id: run_id.to_string(),
            result: result.clone(),
        });
        result
    }

    fn events(&self) -> EventEmitter {
        EventEmitter::new(self.opts.clone(), self.renderer.clone())
    }

    async fn execute(&self, schedule: Schedule) -> ExecutionResult {
        let Schedule {
            run_id,
            tasks,
            batches,
            independent_count,
            dependent_count,
            fallback_used,
        } = schedule;

        let start = Instant::now();
        let total_tasks = tasks.len();
        let total_batches = batches.len();
        let events = self.events();

        events.emit(RenderEvent::RunStart {
            run_id: run_id.clone(),
            total_tasks,
            total_batches,
        });
        events.emit(RenderEvent::Plan {
            run_id: run_id.clone(),
            batches: batches.clone(),
        });
        tracing::info!(run_id = %run_id, total_tasks, total_batches, "run started");

        let monitor = Arc::new(Mutex::new(ProgressMonitor::new(
            total_tasks,
            self.opts.progress_bar && !self.opts.is_jsonl(),
        )));

        let runner = Arc::new(TaskRunner {
            run_id: run_id.clone(),
            registry: self.registry.clone(),
            task_timeout: self.opts.task_timeout,
            events: events.clone(),
            state: SharedState::default(),
            progress: self.progress.clone(),
            monitor: monitor.clone(),
        });

        let order: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        let mut pending: HashMap<TaskId, Task> = tasks.into_iter().map(|t| (t.id, t)).collect();

        let mut batches_run = 0;
        let mut halted_early = false;
        let mut cancelled = false;

        for (batch_id, ids) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(run_id = %run_id, batch_id, "run cancelled");
                cancelled = true;
                break;
            }

            let batch: Vec<Task> = ids.iter().filter_map(|id| pending.remove(id)).collect();
            if batch.is_empty() {
                continue;
            }

            if let Ok(mut monitor) = monitor.lock() {
                monitor.update_batch(batch_id, total_batches);
            }
            events.emit(RenderEvent::BatchStart {
                run_id: run_id.clone(),
                batch_id,
                task_ids: ids.clone(),
            });
            tracing::debug!(batch_id, tasks = batch.len(), "batch started");

            let finished =
                execute_batch_parallel(runner.clone(), batch, batch_id, self.opts.max_workers)
                    .await;
            batches_run += 1;

            events.emit(RenderEvent::BatchEnd {
                run_id: run_id.clone(),
                batch_id,
            });

            // Halt only when every task still to come is downstream of a failure
            let nothing_succeeded = finished.iter().all(|t| t.status.blocks_dependents());
            if nothing_succeeded
                && remaining_all_blocked(&runner.state, &pending, &batches[batch_id + 1..])
            {
                tracing::warn!(run_id = %run_id, batch_id, "batch produced no successful task, halting");
                halted_early = true;
                break;
            }
        }

        for id in order {
            let Some(mut task) = pending.remove(&id) else {
                continue;
            };
            let error = if cancelled {
                TaskError::new(
                    TaskErrorKind::Cancelled,
                    format!("task {} cancelled before start", id),
                )
            } else if halted_early {
                TaskError::new(
                    TaskErrorKind::Halted,
                    format!("task {} not run: execution halted early", id),
                )
            } else {
                TaskError::new(
                    TaskErrorKind::Internal,
                    format!("task {} was never scheduled", id),
                )
            };
            task.mark_skipped(error);
            runner.finish(&task);
        }

        let finished = std::mem::take(&mut *lock_state(&runner.state)).into_tasks();
        let duration_ms = start.elapsed().as_millis() as u64;

        let mut result = ExecutionResult {
            run_id: run_id.clone(),
            batches,
            batches_run,
            halted_early,
            fallback_used,
            cancelled,
            duration_ms,
            ..Default::default()
        };
        fill_outcomes(&mut result, &finished);

        if let Ok(monitor) = monitor.lock() {
            monitor.finish(result.success);
        }

        self.stats.record(&ExecutionRecord {
            run_id: run_id.clone(),
            tasks: finished.values().map(TaskTiming::from_task).collect(),
            wall_ms: duration_ms,
            independent_count,
            dependent_count,
        });

        tracing::info!(
            run_id = %run_id,
            success = result.success,
            failed = result.failed_task_ids.len(),
            skipped = result.skipped_task_ids.len(),
            duration_ms,
            "run finished"
        );

        events.emit(RenderEvent::RunEnd {
            run_id,
            result: result.clone(),
        });

        result
    }
}

impl ExecutionEngineBuilder {
    pub fn new(registry: CapabilityRegistry, opts: ExecutionOpts) -> Self {
        Self {
            registry,
            opts,
            inferencer: None,
            renderer: None,
            stats: None,
            progress: None,
            cancel: None,
        }
    }

    pub fn inferencer(mut self, inferencer: Arc<DependencyInferencer>) -> Self {
        self.inferencer = Some(inferencer);
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn OutputRendererPlugin>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Share a statistics aggregate across engines.
    pub fn stats(mut self, stats: Arc<ExecutionStats>) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn cancel_signal(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn build(self) -> ExecutionEngine {
        ExecutionEngine {
            registry: self.registry,
            opts: self.opts,
            inferencer: self.inferencer.unwrap_or_default(),
            renderer: self.renderer,
            stats: self.stats.unwrap_or_default(),
            progress: self.progress,
            cancel: self.cancel.unwrap_or_default(),
        }
    }
}

fn sequential_schedule(run_id: String, tasks: Vec<Task>) -> Schedule {
    let batches = tasks.iter().map(|t| vec![t.id]).collect();
    let dependent_count = tasks.len();
    Schedule {
        run_id,
        tasks,
        batches,
        independent_count: 0,
        dependent_count,
        fallback_used: true,
    }
}

/// Tasks with no edge in either direction vs. the rest
fn independence_counts(graph: &TaskGraph) -> (usize, usize) {
    let independent = graph
        .task_ids()
        .iter()
        .filter(|id| graph.dependencies(**id).is_empty() && graph.dependents(**id).is_empty())
        .count();
    (independent, graph.len() - independent)
}

fn fill_outcomes(result: &mut ExecutionResult, finished: &BTreeMap<TaskId, Task>) {
    for (id, task) in finished {
        match task.status {
            TaskStatus::Failed => result.failed_task_ids.push(*id),
            TaskStatus::Skipped => result.skipped_task_ids.push(*id),
            _ => {}
        }
        result.results.insert(*id, TaskOutcome::from_task(task));
    }
    result.success = finished.values().all(|t| t.status == TaskStatus::Completed);
}

/// Execute a plan against a registry
///
/// Convenience entry point over [`ExecutionEngine::run_plan`].
pub async fn execute_plan(
    plan: &Plan,
    registry: CapabilityRegistry,
    opts: ExecutionOpts,
) -> ExecutionResult {
    ExecutionEngine::new(registry, opts).run_plan(plan).await
}
