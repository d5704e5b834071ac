//! Dependency-aware task execution
//!
//! This module turns a set of capability invocations into an ordered
//! sequence of concurrently executable batches and runs them. It supports:
//! - Explicit (`dependsOn`) or inferred dependency edges
//! - Plan validation (cycles, dangling references, unknown capabilities)
//! - Topological batching with Kahn's algorithm
//! - Bounded parallel execution with per-task timeouts and failure isolation
//! - Skip propagation, early halt, cancellation and a sequential fallback
//! - Execution statistics (per-capability timings, speedup)
//!
//! # Architecture
//!
//! ```text
//! PlanInput
//!   ↓
//! Planner::build()  (explicit edges | DependencyInferencer::infer_edges)
//!   ↓
//! Plan { tasks, dependencies }
//!   ↓
//! PlanValidator::validate() → ValidationReport
//!   ↓
//! TaskGraph::topological_sort() → Vec<Vec<TaskId>> (batches)
//!   ↓
//! ExecutionEngine::run_plan() → ExecutionResult
//! ```

mod args;
mod cancel;
mod engine;
mod graph;
mod inference;
mod output;
mod planner;
mod progress;
mod registry;
mod scheduler;
mod stats;
pub mod traits;
pub mod types;
mod validator;

pub use args::{referenced_tasks, resolve_args};
pub use cancel::CancelSignal;
pub use engine::{execute_plan, ExecutionEngine, ExecutionEngineBuilder};
pub use graph::{batch_index, TaskGraph};
pub use inference::{DependencyInferencer, Partition, ResourceConflictPredicate};
pub use output::{emit_json, status_icon, EventEmitter, JsonlEvent};
pub use planner::Planner;
pub use progress::ProgressMonitor;
pub use registry::CapabilityRegistry;
pub use scheduler::{execute_batch_parallel, ProgressCallback, RunState, TaskRunner};
pub use stats::{CapabilityTiming, ExecutionRecord, ExecutionStats, StatsSnapshot, TaskTiming};
pub use types::{
    DependencyMode, ExecutionOpts, ExecutionResult, Plan, PlanInput, Task, TaskId, TaskOutcome,
    TaskSpec, TaskStatus,
};
pub use validator::{PlanValidator, ValidationIssue, ValidationReport};
