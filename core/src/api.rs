//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `taskweave_core::api` instead of reaching into internal modules.

pub use crate::config::{
    load_default, load_from_path, AppConfig, ExecutorConfig, InferenceConfig, LoggingConfig,
};
pub use crate::error::{CliError, ErrorCode, ExecutorError};
pub use crate::executor::traits::{
    AsyncFnCapability, Capability, CapabilityFuture, ConflictPredicate, FnCapability,
    OutputRendererPlugin, PairVerdict, RenderEvent,
};
pub use crate::executor::types::{
    ArgMap, CapabilityError, Complexity, DependencyMode, DependencySource, ExecutionOpts,
    ExecutionResult, Plan, PlanInput, Task, TaskError, TaskErrorKind, TaskId, TaskOutcome,
    TaskSpec, TaskStatus,
};
pub use crate::executor::{
    execute_plan, CancelSignal, CapabilityRegistry, DependencyInferencer, ExecutionEngine,
    ExecutionStats, Partition, PlanValidator, Planner, ProgressCallback, ResourceConflictPredicate,
    StatsSnapshot, TaskGraph, ValidationReport,
};
