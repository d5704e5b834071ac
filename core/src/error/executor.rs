use thiserror::Error;

use crate::executor::types::TaskId;

/// Stable protocol error codes reported alongside executor failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    DependencyError,
    CircularDependency,
    CapabilityUnavailable,
    Timeout,
    CapabilityFailed,
    SchedulingFallback,
    Cancelled,
    GeneralError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::DependencyError => "DEPENDENCY_ERROR",
            Self::CircularDependency => "CIRCULAR_DEPENDENCY",
            Self::CapabilityUnavailable => "CAPABILITY_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::CapabilityFailed => "CAPABILITY_FAILED",
            Self::SchedulingFallback => "SCHEDULING_FALLBACK",
            Self::Cancelled => "CANCELLED",
            Self::GeneralError => "GENERAL_ERROR",
        }
    }
}

/// Executor-specific errors for plan validation, scheduling and task execution
#[derive(Error, Debug, Clone)]
pub enum ExecutorError {
    #[error("Plan validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Duplicate task ID: {0}")]
    DuplicateTaskId(TaskId),

    #[error("Dependency not found: task {task_id} depends on {missing_dep}")]
    DependencyNotFound { task_id: TaskId, missing_dep: TaskId },

    #[error("Circular dependency detected: {0}")]
    CircularDependency(String),

    #[error("Capability not registered: {0}")]
    CapabilityNotFound(String),

    #[error("Task {task_id} timed out after {timeout_ms}ms")]
    Timeout { task_id: TaskId, timeout_ms: u64 },

    #[error("Task {task_id} failed: {message}")]
    Capability { task_id: TaskId, message: String },

    #[error("Scheduling failed, falling back to sequential execution: {0}")]
    SchedulingFallback(String),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Runner error: {0}")]
    Runner(String),
}

impl ExecutorError {
    /// Map executor error to protocol error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::ValidationError,
            Self::DuplicateTaskId(_) => ErrorCode::ValidationError,
            Self::DependencyNotFound { .. } => ErrorCode::DependencyError,
            Self::CircularDependency(_) => ErrorCode::CircularDependency,
            Self::CapabilityNotFound(_) => ErrorCode::CapabilityUnavailable,
            Self::Timeout { .. } => ErrorCode::Timeout,
            Self::Capability { .. } => ErrorCode::CapabilityFailed,
            Self::SchedulingFallback(_) => ErrorCode::SchedulingFallback,
            Self::Cancelled => ErrorCode::Cancelled,
            Self::Runner(_) => ErrorCode::GeneralError,
        }
    }

    /// Whether this error prevents a plan from executing at all.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::DuplicateTaskId(_)
                | Self::DependencyNotFound { .. }
                | Self::CircularDependency(_)
                | Self::CapabilityNotFound(_)
        )
    }
}
