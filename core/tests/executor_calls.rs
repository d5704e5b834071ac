mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use taskweave_core::api::{
    ArgMap, CapabilityError, CapabilityRegistry, ConflictPredicate, DependencyInferencer,
    DependencyMode, ExecutionEngine, ExecutorError, FnCapability, PairVerdict, PlanInput, Task,
    TaskErrorKind, TaskSpec, TaskStatus,
};

use common::{opts, registry, sleep_task, Gauge};

type Store = Arc<Mutex<HashMap<String, String>>>;

/// Registry with in-memory `read_file` / `write_file` plus the common mocks.
/// Writes under `locked/` fail.
fn file_registry(gauge: Arc<Gauge>, store: Store) -> CapabilityRegistry {
    let writes = store.clone();
    let write = FnCapability::new("write_file", move |args: &ArgMap| {
        let path = path_arg(args)?;
        if path.starts_with("locked/") {
            return Err(CapabilityError::Failed(format!("permission denied: {path}")));
        }
        let content = args
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        writes.lock().unwrap().insert(path, content.to_string());
        Ok(json!({ "written": content.len() }))
    });

    let reads = store;
    let read = FnCapability::new("read_file", move |args: &ArgMap| {
        let path = path_arg(args)?;
        reads
            .lock()
            .unwrap()
            .get(&path)
            .map(|c| json!(c))
            .ok_or_else(|| CapabilityError::Failed(format!("no such file: {path}")))
    });

    registry(gauge).with(Arc::new(write)).with(Arc::new(read))
}

fn path_arg(args: &ArgMap) -> Result<String, CapabilityError> {
    args.get("path")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CapabilityError::InvalidArgs("missing 'path'".into()))
}

#[tokio::test]
async fn read_only_calls_run_as_one_batch() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge.clone()), opts(3, 5_000));
    let calls = vec![sleep_task(1, 100), sleep_task(2, 100), sleep_task(3, 100)];

    let result = engine.run_calls(&calls).await;

    assert!(result.success);
    assert_eq!(result.batches, vec![vec![1, 2, 3]]);
    assert_eq!(gauge.peak(), 3);

    let stats = engine.stats().get_stats();
    assert_eq!(stats.independent_count, 3);
    assert_eq!(stats.dependent_count, 0);
}

#[tokio::test]
async fn write_then_read_is_serialized() {
    let gauge = Arc::new(Gauge::default());
    let store: Store = Arc::default();
    let engine = ExecutionEngine::new(file_registry(gauge, store.clone()), opts(3, 5_000));
    let calls = vec![
        TaskSpec::new(1, "write_file")
            .with_arg("path", "notes.md")
            .with_arg("content", "hello"),
        TaskSpec::new(2, "read_file").with_arg("path", "notes.md"),
        sleep_task(3, 1),
    ];

    let result = engine.run_calls(&calls).await;

    assert!(result.success);
    assert_eq!(result.batches, vec![vec![3], vec![1], vec![2]]);
    assert_eq!(result.value(2), Some(&json!("hello")));

    let stats = engine.stats().get_stats();
    assert_eq!(stats.independent_count, 1);
    assert_eq!(stats.dependent_count, 2);
}

#[tokio::test]
async fn failed_writer_skips_its_reader() {
    let gauge = Arc::new(Gauge::default());
    let store: Store = Arc::default();
    let engine = ExecutionEngine::new(file_registry(gauge, store), opts(3, 5_000));
    let calls = vec![
        TaskSpec::new(1, "read_file").with_arg("path", "missing.txt"),
        TaskSpec::new(2, "write_file")
            .with_arg("path", "missing.txt")
            .with_arg("content", "late"),
    ];

    let result = engine.run_calls(&calls).await;

    // Read-before-write orders the writer after the failing reader
    assert_eq!(result.status(1), Some(TaskStatus::Failed));
    assert_eq!(result.status(2), Some(TaskStatus::Skipped));
    assert!(!result.success);
}

#[tokio::test]
async fn failed_chain_does_not_halt_an_unrelated_chain() {
    let gauge = Arc::new(Gauge::default());
    let store: Store = Arc::default();
    let engine = ExecutionEngine::new(file_registry(gauge, store.clone()), opts(3, 5_000));
    let calls = vec![
        TaskSpec::new(1, "write_file")
            .with_arg("path", "locked/a.txt")
            .with_arg("content", "a"),
        TaskSpec::new(2, "read_file").with_arg("path", "locked/a.txt"),
        TaskSpec::new(3, "write_file")
            .with_arg("path", "b.txt")
            .with_arg("content", "b"),
        TaskSpec::new(4, "read_file").with_arg("path", "b.txt"),
    ];

    let result = engine.run_calls(&calls).await;

    assert_eq!(result.batches, vec![vec![1], vec![2], vec![3], vec![4]]);
    assert!(!result.halted_early);
    assert_eq!(result.batches_run, 4);
    assert_eq!(result.failed_task_ids, vec![1]);
    assert_eq!(result.skipped_task_ids, vec![2]);
    assert_eq!(
        result.results[&2].error.as_ref().map(|e| e.kind),
        Some(TaskErrorKind::DependencyFailed)
    );
    assert_eq!(result.status(3), Some(TaskStatus::Completed));
    assert_eq!(result.value(4), Some(&json!("b")));
    assert_eq!(store.lock().unwrap().get("b.txt").map(String::as_str), Some("b"));
}

#[tokio::test]
async fn unknown_capability_rejects_the_call_set() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge.clone()), opts(3, 5_000));
    let calls = vec![sleep_task(1, 1), TaskSpec::new(2, "code_exec")];

    let result = engine.run_calls(&calls).await;

    assert_eq!(gauge.calls(), 0);
    assert_eq!(
        result.validation_issues,
        Some(vec!["capability unavailable: task 2 requires 'code_exec'".to_string()])
    );
}

struct Exploding;

impl ConflictPredicate for Exploding {
    fn name(&self) -> &str {
        "exploding"
    }

    fn check(&self, _: &Task, _: &Task) -> Result<PairVerdict, ExecutorError> {
        Err(ExecutorError::Runner("predicate bug".into()))
    }
}

#[tokio::test]
async fn inference_failure_falls_back_to_sequential() {
    let gauge = Arc::new(Gauge::default());
    let inferencer = DependencyInferencer::new().with_predicate(Arc::new(Exploding));
    let engine = ExecutionEngine::builder(registry(gauge.clone()), opts(3, 5_000))
        .inferencer(Arc::new(inferencer))
        .build();
    let calls = vec![sleep_task(1, 20), sleep_task(2, 20), sleep_task(3, 20)];

    let result = engine.run_calls(&calls).await;

    assert!(result.success);
    assert!(result.fallback_used);
    assert_eq!(result.batches, vec![vec![1], vec![2], vec![3]]);
    assert_eq!(gauge.peak(), 1);
}

#[tokio::test]
async fn disabled_fallback_fails_every_task() {
    let gauge = Arc::new(Gauge::default());
    let inferencer = DependencyInferencer::new().with_predicate(Arc::new(Exploding));
    let engine = ExecutionEngine::builder(
        registry(gauge.clone()),
        opts(3, 5_000).with_sequential_fallback(false),
    )
    .inferencer(Arc::new(inferencer))
    .build();

    let result = engine.run_calls(&[sleep_task(1, 1), sleep_task(2, 1)]).await;

    assert!(!result.success);
    assert!(!result.fallback_used);
    assert_eq!(result.failed_task_ids, vec![1, 2]);
    assert_eq!(gauge.calls(), 0);
    assert_eq!(
        result.results[&1].error.as_ref().map(|e| e.kind),
        Some(TaskErrorKind::Internal)
    );
}

#[tokio::test]
async fn plan_input_infers_edges_when_none_declared() {
    let gauge = Arc::new(Gauge::default());
    let store: Store = Arc::default();
    let engine = ExecutionEngine::new(
        file_registry(gauge, store),
        opts(3, 5_000).with_dependency_mode(DependencyMode::Auto),
    );
    let input = PlanInput {
        request: "write the notes then read them back".into(),
        tasks: vec![
            TaskSpec::new(1, "write_file")
                .with_arg("path", "a.txt")
                .with_arg("content", "A"),
            TaskSpec::new(2, "write_file")
                .with_arg("path", "b.txt")
                .with_arg("content", "B"),
            TaskSpec::new(3, "read_file").with_arg("path", "a.txt"),
            TaskSpec::new(4, "read_file").with_arg("path", "b.txt"),
        ],
    };

    let result = engine.run_input(&input).await;

    assert!(result.success);
    assert_eq!(result.batches, vec![vec![1, 2], vec![3, 4]]);
    assert_eq!(result.value(3), Some(&json!("A")));
    assert_eq!(result.value(4), Some(&json!("B")));
}

#[tokio::test]
async fn plan_input_fallback_after_inference_error() {
    let gauge = Arc::new(Gauge::default());
    let inferencer = DependencyInferencer::new().with_predicate(Arc::new(Exploding));
    let engine = ExecutionEngine::builder(registry(gauge), opts(3, 5_000))
        .inferencer(Arc::new(inferencer))
        .build();
    let input = PlanInput {
        request: String::new(),
        tasks: vec![sleep_task(1, 1), TaskSpec::new(2, "echo")],
    };

    let result = engine.run_input(&input).await;

    assert!(result.fallback_used);
    assert!(result.success);
    assert_eq!(result.batches, vec![vec![1], vec![2]]);
}
