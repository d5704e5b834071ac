//! Command handlers: load plan files, wire the engine from configuration and
//! report results.
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use taskweave_core::api::{
    AppConfig, CancelSignal, CliError, ExecutionEngine, ExecutionOpts, ExecutionResult,
    PlanInput, TaskSpec,
};
use taskweave_core::executor::status_icon;
use taskweave_plugins::factory;

use crate::commands::cli::{ExecArgs, ExecOptions, PlanArgs, RunArgs};

/// Exit code for a run whose tasks did not all complete.
pub const EXIT_TASKS_FAILED: i32 = 1;
/// Exit code for a plan rejected before anything ran.
pub const EXIT_REJECTED: i32 = 2;

const MAX_VALUE_CHARS: usize = 120;

pub fn load_config(path: Option<&str>) -> Result<AppConfig, CliError> {
    let cfg = match path {
        Some(p) => taskweave_core::config::load_from_path(Path::new(p)),
        None => taskweave_core::config::load_default(),
    };
    cfg.map_err(|e| CliError::Config(e.to_string()))
}

/// Plan file: either a full `PlanInput` object or a bare array of task specs.
pub fn read_plan_input(path: &str) -> Result<PlanInput, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Command(format!("failed to read plan {}: {}", path, e)))?;
    let value: Value = serde_json::from_str(&raw)?;
    let input = match value {
        Value::Array(_) => PlanInput {
            request: String::new(),
            tasks: serde_json::from_value(value)?,
        },
        other => serde_json::from_value(other)?,
    };
    Ok(input)
}

pub fn read_calls(path: &str) -> Result<Vec<TaskSpec>, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::Command(format!("failed to read calls {}: {}", path, e)))?;
    Ok(serde_json::from_str(&raw)?)
}

/// Fold command line flags into the loaded configuration.
pub fn apply_overrides(
    cfg: &mut AppConfig,
    plan: Option<&PlanArgs>,
    stream_format: Option<&str>,
    exec: Option<&ExecOptions>,
) {
    if let Some(mode) = plan.and_then(|p| p.mode) {
        cfg.executor.dependency_mode = mode.into();
    }
    if let Some(format) = stream_format {
        cfg.executor.stream_format = format.to_string();
    }
    if let Some(exec) = exec {
        if let Some(n) = exec.max_workers {
            cfg.executor.max_workers = n;
        }
        if let Some(ms) = exec.timeout_ms {
            cfg.executor.task_timeout_ms = ms;
        }
        if exec.progress {
            cfg.executor.progress_bar = true;
        }
        if exec.no_fallback {
            cfg.executor.sequential_fallback = false;
        }
    }
}

fn engine_for(cfg: &AppConfig, exec: Option<&ExecOptions>) -> ExecutionEngine {
    let mut opts = ExecutionOpts::from_config(&cfg.executor);
    opts.verbose = exec.map(|e| e.verbose).unwrap_or(false);
    let root = exec.and_then(|e| e.root.as_deref()).map(PathBuf::from);

    let mut builder = factory::engine_builder(cfg, opts.clone(), root);
    if opts.is_jsonl() || opts.verbose {
        builder = builder.renderer(factory::build_renderer(&opts.stream_format));
    }
    builder.build()
}

#[tracing::instrument(name = "cli.validate", skip_all, fields(plan = %args.plan))]
pub async fn cmd_validate(mut cfg: AppConfig, args: PlanArgs) -> Result<i32, CliError> {
    apply_overrides(&mut cfg, Some(&args), args.stream_format.as_deref(), None);
    let input = read_plan_input(&args.plan)?;
    let engine = engine_for(&cfg, None);
    let plan = engine.build_plan(&input)?;
    let report = engine.validate(&plan);
    let issues = report.messages();

    if engine.opts().is_jsonl() {
        println!(
            "{}",
            json!({ "valid": report.valid, "tasks": plan.tasks.len(), "issues": issues })
        );
    } else if report.valid {
        println!("✅ plan valid ({} tasks)", plan.tasks.len());
    } else {
        println!("❌ plan invalid:");
        for issue in &issues {
            println!("  - {}", issue);
        }
    }

    Ok(if report.valid { 0 } else { EXIT_TASKS_FAILED })
}

#[tracing::instrument(name = "cli.schedule", skip_all, fields(plan = %args.plan))]
pub async fn cmd_schedule(mut cfg: AppConfig, args: PlanArgs) -> Result<i32, CliError> {
    apply_overrides(&mut cfg, Some(&args), args.stream_format.as_deref(), None);
    let input = read_plan_input(&args.plan)?;
    let engine = engine_for(&cfg, None);
    let plan = engine.build_plan(&input)?;

    let report = engine.validate(&plan);
    if !report.valid {
        for issue in report.messages() {
            eprintln!("  - {}", issue);
        }
        return Ok(EXIT_TASKS_FAILED);
    }
    let batches = engine.schedule(&plan)?;

    if engine.opts().is_jsonl() {
        println!(
            "{}",
            json!({
                "plan_id": plan.id,
                "complexity": plan.complexity.as_str(),
                "dependencies": plan.dependencies,
                "batches": batches,
            })
        );
    } else {
        print!("{}", plan.summary());
        for (idx, batch) in batches.iter().enumerate() {
            let ids: Vec<String> = batch.iter().map(|id| id.to_string()).collect();
            println!("Batch {}: {}", idx, ids.join(", "));
        }
    }
    Ok(0)
}

#[tracing::instrument(name = "cli.run", skip_all, fields(plan = %args.plan.plan))]
pub async fn cmd_run(mut cfg: AppConfig, args: RunArgs) -> Result<i32, CliError> {
    apply_overrides(
        &mut cfg,
        Some(&args.plan),
        args.plan.stream_format.as_deref(),
        Some(&args.exec),
    );
    let input = read_plan_input(&args.plan.plan)?;
    let engine = engine_for(&cfg, Some(&args.exec));

    let interrupt = cancel_on_ctrl_c(engine.cancel_signal());
    let result = engine.run_input(&input).await;
    interrupt.abort();

    report(&engine, &result, args.exec.stats);
    Ok(exit_code_for_result(&result))
}

#[tracing::instrument(name = "cli.exec", skip_all, fields(calls = %args.calls))]
pub async fn cmd_exec(mut cfg: AppConfig, args: ExecArgs) -> Result<i32, CliError> {
    apply_overrides(&mut cfg, None, args.stream_format.as_deref(), Some(&args.exec));
    let specs = read_calls(&args.calls)?;
    let engine = engine_for(&cfg, Some(&args.exec));

    let interrupt = cancel_on_ctrl_c(engine.cancel_signal());
    let result = engine.run_calls(&specs).await;
    interrupt.abort();

    report(&engine, &result, args.exec.stats);
    Ok(exit_code_for_result(&result))
}

fn cancel_on_ctrl_c(signal: CancelSignal) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling remaining batches");
            signal.cancel();
        }
    })
}

pub fn exit_code_for_result(result: &ExecutionResult) -> i32 {
    if result.validation_issues.is_some() {
        EXIT_REJECTED
    } else if result.success {
        0
    } else {
        EXIT_TASKS_FAILED
    }
}

fn report(engine: &ExecutionEngine, result: &ExecutionResult, show_stats: bool) {
    let stats = show_stats.then(|| engine.stats().get_stats());

    if engine.opts().is_jsonl() {
        println!("{}", serde_json::to_string(result).unwrap_or_else(|_| "{}".into()));
        if let Some(stats) = stats {
            println!("{}", json!({ "type": "stats", "stats": stats }));
        }
        return;
    }

    for line in result_lines(result) {
        println!("{}", line);
    }
    if let Some(stats) = stats {
        println!("Stats:");
        println!(
            "{}",
            serde_json::to_string_pretty(&stats).unwrap_or_else(|_| "{}".into())
        );
    }
}

/// One text line per task in id order.
pub fn result_lines(result: &ExecutionResult) -> Vec<String> {
    result
        .results
        .iter()
        .map(|(id, outcome)| {
            let detail = match (&outcome.value, &outcome.error) {
                (_, Some(err)) => err.message.clone(),
                (Some(value), None) => truncate(&value.to_string(), MAX_VALUE_CHARS),
                (None, None) => String::new(),
            };
            format!(
                "{} task {} {} ({}ms) {}",
                status_icon(outcome.status),
                id,
                outcome.status.as_str(),
                outcome.duration_ms,
                detail
            )
            .trim_end()
            .to_string()
        })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::ModeArg;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use taskweave_core::api::{DependencyMode, TaskOutcome, TaskStatus};

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_read_plan_input_object_and_array() {
        let object = write_temp(
            r#"{"request": "read then echo", "tasks": [
                {"id": 1, "capability": "read_file", "args": {"path": "a.txt"}},
                {"id": 2, "capability": "echo", "dependsOn": [1]}
            ]}"#,
        );
        let input = read_plan_input(object.path().to_str().unwrap()).unwrap();
        assert_eq!(input.request, "read then echo");
        assert_eq!(input.tasks.len(), 2);
        assert_eq!(input.tasks[1].depends_on, Some(vec![1]));

        let array = write_temp(r#"[{"id": 7, "capability": "echo"}]"#);
        let input = read_plan_input(array.path().to_str().unwrap()).unwrap();
        assert_eq!(input.request, "");
        assert_eq!(input.tasks[0].id, 7);
        assert_eq!(input.tasks[0].depends_on, None);
    }

    #[test]
    fn test_read_plan_input_errors() {
        assert!(matches!(
            read_plan_input("/definitely/not/here.json"),
            Err(CliError::Command(_))
        ));
        let bad = write_temp("{not json");
        assert!(matches!(
            read_plan_input(bad.path().to_str().unwrap()),
            Err(CliError::Json(_))
        ));
    }

    #[test]
    fn test_overrides_fold_into_config() {
        let mut cfg = AppConfig::default();
        let plan = PlanArgs {
            plan: "p.json".into(),
            mode: Some(ModeArg::Explicit),
            stream_format: None,
        };
        let exec = ExecOptions {
            max_workers: Some(9),
            timeout_ms: Some(250),
            no_fallback: true,
            ..Default::default()
        };
        apply_overrides(&mut cfg, Some(&plan), Some("jsonl"), Some(&exec));

        assert_eq!(cfg.executor.dependency_mode, DependencyMode::Explicit);
        assert_eq!(cfg.executor.stream_format, "jsonl");
        assert_eq!(cfg.executor.max_workers, 9);
        assert_eq!(cfg.executor.task_timeout_ms, 250);
        assert!(!cfg.executor.sequential_fallback);
    }

    #[test]
    fn test_exit_codes() {
        let ok = ExecutionResult {
            success: true,
            ..Default::default()
        };
        assert_eq!(exit_code_for_result(&ok), 0);

        let failed = ExecutionResult {
            failed_task_ids: vec![1],
            ..Default::default()
        };
        assert_eq!(exit_code_for_result(&failed), EXIT_TASKS_FAILED);

        let rejected = ExecutionResult::rejected("r", vec!["duplicate task id: 1".into()]);
        assert_eq!(exit_code_for_result(&rejected), EXIT_REJECTED);
    }

    #[test]
    fn test_result_lines() {
        let mut result = ExecutionResult::default();
        result.results.insert(
            1,
            TaskOutcome {
                status: TaskStatus::Completed,
                value: Some(json!({"k": "x".repeat(300)})),
                error: None,
                duration_ms: 3,
            },
        );
        let lines = result_lines(&result);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("✅ task 1 completed (3ms) {"));
        assert!(lines[0].ends_with("..."));
    }

    #[tokio::test]
    async fn test_exec_command_runs_calls() {
        let dir = tempfile::tempdir().unwrap();
        let calls = write_temp(
            r#"[
                {"id": 1, "capability": "write_file", "args": {"path": "x.txt", "content": "hi"}},
                {"id": 2, "capability": "read_file", "args": {"path": "x.txt"}}
            ]"#,
        );
        let args = ExecArgs {
            calls: calls.path().to_string_lossy().into_owned(),
            stream_format: Some("jsonl".into()),
            exec: ExecOptions {
                root: Some(dir.path().to_string_lossy().into_owned()),
                ..Default::default()
            },
        };

        let code = cmd_exec(AppConfig::default(), args).await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(dir.path().join("x.txt")).unwrap(), "hi");
    }
}
