use serde::{Deserialize, Serialize};

use crate::executor::types::{DependencyMode, DEFAULT_MAX_WORKERS, DEFAULT_TASK_TIMEOUT_MS};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub inference: InferenceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default = "default_logging_file")]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "taskweave_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_file() -> bool {
    false
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: default_logging_file(),
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Worker pool size for one batch
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-task timeout in milliseconds
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,

    /// "text" | "jsonl"
    #[serde(default = "default_stream_format")]
    pub stream_format: String,

    #[serde(default)]
    pub progress_bar: bool,

    #[serde(default = "default_sequential_fallback")]
    pub sequential_fallback: bool,

    #[serde(default)]
    pub dependency_mode: DependencyMode,
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_task_timeout_ms() -> u64 {
    DEFAULT_TASK_TIMEOUT_MS
}

fn default_stream_format() -> String {
    "text".to_string()
}

fn default_sequential_fallback() -> bool {
    true
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            task_timeout_ms: default_task_timeout_ms(),
            stream_format: default_stream_format(),
            progress_bar: false,
            sequential_fallback: default_sequential_fallback(),
            dependency_mode: DependencyMode::Auto,
        }
    }
}

/// Tables driving dependency inference for undeclared edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Capability pairs that never conflict, in either order
    #[serde(default = "default_commuting_pairs")]
    pub commuting_pairs: Vec<[String; 2]>,

    #[serde(default = "default_read_only_capabilities")]
    pub read_only_capabilities: Vec<String>,

    #[serde(default = "default_write_capabilities")]
    pub write_capabilities: Vec<String>,

    /// Argument keys whose string value names a resource
    #[serde(default = "default_resource_keys")]
    pub resource_keys: Vec<String>,

    /// Capabilities that never run alongside another task
    #[serde(default)]
    pub exclusive_capabilities: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_commuting_pairs() -> Vec<[String; 2]> {
    [
        ("web_search", "web_search"),
        ("web_search", "read_file"),
        ("read_file", "read_file"),
        ("read_file", "list_dir"),
        ("list_dir", "list_dir"),
    ]
    .iter()
    .map(|(a, b)| [a.to_string(), b.to_string()])
    .collect()
}

fn default_read_only_capabilities() -> Vec<String> {
    strings(&["echo", "sleep", "read_file", "list_dir", "web_search"])
}

fn default_write_capabilities() -> Vec<String> {
    strings(&["write_file"])
}

fn default_resource_keys() -> Vec<String> {
    strings(&["path", "file", "target"])
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            commuting_pairs: default_commuting_pairs(),
            read_only_capabilities: default_read_only_capabilities(),
            write_capabilities: default_write_capabilities(),
            resource_keys: default_resource_keys(),
            exclusive_capabilities: Vec::new(),
        }
    }
}
