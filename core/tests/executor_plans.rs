mod common;

use std::sync::Arc;
use std::time::Instant;

use pretty_assertions::assert_eq;
use taskweave_core::api::{ExecutionEngine, TaskSpec, TaskStatus};
use taskweave_core::executor::batch_index;

use common::{explicit_plan, opts, registry, sleep_task, Gauge};

#[tokio::test]
async fn independent_tasks_share_one_batch() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge.clone()), opts(3, 5_000));
    let plan = explicit_plan(vec![sleep_task(1, 10), sleep_task(2, 10), sleep_task(3, 10)]);

    let result = engine.run_plan(&plan).await;

    assert!(result.success);
    assert_eq!(result.batches, vec![vec![1, 2, 3]]);
    assert_eq!(result.completed(), 3);
    assert_eq!(gauge.calls(), 3);
}

#[tokio::test]
async fn chain_and_diamond_batches() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge), opts(3, 5_000));

    let chain = explicit_plan(vec![
        sleep_task(1, 1),
        sleep_task(2, 1).depends_on([1]),
        sleep_task(3, 1).depends_on([2]),
    ]);
    let result = engine.run_plan(&chain).await;
    assert!(result.success);
    assert_eq!(result.batches, vec![vec![1], vec![2], vec![3]]);

    let diamond = explicit_plan(vec![
        sleep_task(1, 1),
        sleep_task(2, 1).depends_on([1]),
        sleep_task(3, 1).depends_on([1]),
        sleep_task(4, 1).depends_on([2, 3]),
    ]);
    let result = engine.run_plan(&diamond).await;
    assert!(result.success);
    assert_eq!(result.batches, vec![vec![1], vec![2, 3], vec![4]]);
}

#[tokio::test]
async fn dependencies_always_run_in_earlier_batches() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge), opts(4, 5_000));
    let plan = explicit_plan(vec![
        sleep_task(1, 1),
        sleep_task(2, 1).depends_on([1]),
        sleep_task(3, 1),
        sleep_task(4, 1).depends_on([3, 2]),
        sleep_task(5, 1).depends_on([1]),
        sleep_task(6, 1).depends_on([5, 4]),
        sleep_task(7, 1).depends_on([3]),
    ]);

    let result = engine.run_plan(&plan).await;
    assert!(result.success);

    let index = batch_index(&result.batches);
    for task in &plan.tasks {
        for dep in &task.depends_on {
            assert!(index[dep] < index[&task.id], "{dep} must run before {}", task.id);
        }
    }
}

#[tokio::test]
async fn independent_tasks_run_concurrently() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge.clone()), opts(4, 5_000));
    let plan = explicit_plan((1..=4).map(|id| sleep_task(id, 200)).collect());

    let start = Instant::now();
    let result = engine.run_plan(&plan).await;
    let elapsed = start.elapsed();

    assert!(result.success);
    assert_eq!(gauge.peak(), 4);
    // Serial cost is 800ms
    assert!(elapsed.as_millis() < 600, "took {:?}", elapsed);

    let stats = engine.stats().get_stats();
    assert_eq!(stats.total_executions, 1);
    assert!(stats.average_speedup > 2.0, "speedup {}", stats.average_speedup);
    assert_eq!(stats.per_capability_timings["sleep"].count, 4);
}

#[tokio::test]
async fn worker_pool_bounds_concurrency() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge.clone()), opts(2, 5_000));
    let plan = explicit_plan((1..=6).map(|id| sleep_task(id, 30)).collect());

    let result = engine.run_plan(&plan).await;

    assert!(result.success);
    assert_eq!(result.batches.len(), 1);
    assert_eq!(gauge.calls(), 6);
    assert_eq!(gauge.peak(), 2);
}

#[tokio::test]
async fn cyclic_plan_is_rejected_before_execution() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge.clone()), opts(3, 5_000));
    let plan = explicit_plan(vec![
        sleep_task(1, 1).depends_on([2]),
        sleep_task(2, 1).depends_on([1]),
        sleep_task(3, 1),
    ]);

    let result = engine.run_plan(&plan).await;

    assert!(!result.success);
    assert!(result.results.is_empty());
    assert_eq!(gauge.calls(), 0);
    let issues = result.validation_issues.unwrap();
    assert_eq!(issues, vec!["circular dependency: 1 -> 2 -> 1".to_string()]);
}

#[tokio::test]
async fn validation_reports_every_issue() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge), opts(3, 5_000));
    let plan = explicit_plan(vec![
        TaskSpec::new(1, "web_search"),
        sleep_task(2, 1).depends_on([42]),
        TaskSpec::new(3, "echo").depends_on([3]),
    ]);

    let first = engine.validate(&plan);
    let second = engine.validate(&plan);

    assert!(!first.valid);
    assert_eq!(first, second);
    assert_eq!(
        first.messages(),
        vec![
            "circular dependency: 3 -> 3",
            "invalid dependency: task 2 depends on unknown task 42",
            "capability unavailable: task 1 requires 'web_search'",
        ]
    );
}

#[tokio::test]
async fn results_feed_later_batches() {
    let gauge = Arc::new(Gauge::default());
    let engine = ExecutionEngine::new(registry(gauge), opts(3, 5_000));
    let plan = explicit_plan(vec![
        sleep_task(1, 5),
        TaskSpec::new(2, "echo")
            .with_arg("waited", "${task.1.slept}")
            .with_arg("note", "slept ${task.1.slept}ms")
            .depends_on([1]),
    ]);

    let result = engine.run_plan(&plan).await;

    assert_eq!(result.status(2), Some(TaskStatus::Completed));
    let value = result.value(2).unwrap();
    assert_eq!(value["waited"], 5);
    assert_eq!(value["note"], "slept 5ms");
}
