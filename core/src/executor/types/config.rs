use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which strategy supplies a plan's dependency edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    /// Explicit edges when any task declares `dependsOn`, inferred otherwise.
    #[default]
    Auto,
    Explicit,
    Inferred,
}

impl FromStr for DependencyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "explicit" => Ok(Self::Explicit),
            "inferred" | "infer" => Ok(Self::Inferred),
            other => Err(format!("unknown dependency mode: {other}")),
        }
    }
}

pub const DEFAULT_MAX_WORKERS: usize = 3;
pub const DEFAULT_TASK_TIMEOUT_MS: u64 = 30_000;

/// Execution options for the engine.
#[derive(Debug, Clone)]
pub struct ExecutionOpts {
    /// Output stream format: "text" or "jsonl"
    pub stream_format: String,

    /// Verbose output (per-task lines in text mode)
    pub verbose: bool,

    /// Quiet mode (suppress non-essential output)
    pub quiet: bool,

    /// Size of the worker pool for one batch
    pub max_workers: usize,

    /// Per-task invocation timeout
    pub task_timeout: Duration,

    /// Enable visual progress bar (disabled for jsonl output)
    pub progress_bar: bool,

    /// Run tasks sequentially when scheduling or inference fails
    pub sequential_fallback: bool,

    pub dependency_mode: DependencyMode,
}

impl Default for ExecutionOpts {
    fn default() -> Self {
        Self {
            stream_format: "text".to_string(),
            verbose: false,
            quiet: true,
            max_workers: DEFAULT_MAX_WORKERS,
            task_timeout: Duration::from_millis(DEFAULT_TASK_TIMEOUT_MS),
            progress_bar: false,
            sequential_fallback: true,
            dependency_mode: DependencyMode::Auto,
        }
    }
}

impl ExecutionOpts {
    pub fn from_config(cfg: &crate::config::ExecutorConfig) -> Self {
        // Progress bar only for text output
        let progress_bar = cfg.progress_bar && cfg.stream_format == "text";

        Self {
            stream_format: cfg.stream_format.clone(),
            verbose: false,
            quiet: false,
            max_workers: cfg.max_workers.max(1),
            task_timeout: Duration::from_millis(cfg.task_timeout_ms.max(1)),
            progress_bar,
            sequential_fallback: cfg.sequential_fallback,
            dependency_mode: cfg.dependency_mode,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    pub fn with_dependency_mode(mut self, mode: DependencyMode) -> Self {
        self.dependency_mode = mode;
        self
    }

    pub fn with_sequential_fallback(mut self, enabled: bool) -> Self {
        self.sequential_fallback = enabled;
        self
    }

    pub fn timeout_ms(&self) -> u64 {
        self.task_timeout.as_millis() as u64
    }

    pub fn is_jsonl(&self) -> bool {
        self.stream_format == "jsonl"
    }
}
