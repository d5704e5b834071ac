use clap::{Args as ClapArgs, Parser, Subcommand};
use taskweave_core::executor::types::DependencyMode;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Auto,
    Explicit,
    Inferred,
}

impl From<ModeArg> for DependencyMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Auto => DependencyMode::Auto,
            ModeArg::Explicit => DependencyMode::Explicit,
            ModeArg::Inferred => DependencyMode::Inferred,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "taskweave", version, about = "Dependency-aware concurrent task runner")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Load this config file only (skips ~/.taskweave/config.toml and ./config.toml).
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct PlanArgs {
    /// Plan file: `{"request": ..., "tasks": [...]}` or a bare task array.
    #[arg(long)]
    pub plan: String,

    /// Where dependency edges come from.
    /// - auto: declared `dependsOn` if any task has one, otherwise inferred
    /// - explicit: only declared `dependsOn`
    /// - inferred: ignore declarations and infer from capabilities/arguments
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    #[arg(long)]
    pub stream_format: Option<String>,
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ExecOptions {
    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Per-task timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Print execution statistics after the run.
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    #[arg(long, default_value_t = false)]
    pub progress: bool,

    /// One line per task/batch event (text format only).
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,

    /// Fail the run instead of falling back to sequential execution.
    #[arg(long, default_value_t = false)]
    pub no_fallback: bool,

    /// Resolve relative file paths against this directory.
    #[arg(long)]
    pub root: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub plan: PlanArgs,

    #[command(flatten)]
    pub exec: ExecOptions,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ExecArgs {
    /// JSON array of task specs; dependencies are always inferred.
    #[arg(long)]
    pub calls: String,

    #[arg(long)]
    pub stream_format: Option<String>,

    #[command(flatten)]
    pub exec: ExecOptions,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a plan for duplicates, cycles, dangling deps and unknown capabilities.
    Validate(PlanArgs),
    /// Print the execution batches of a plan.
    Schedule(PlanArgs),
    /// Execute a plan.
    Run(RunArgs),
    /// Execute ad hoc calls with inferred dependencies.
    Exec(ExecArgs),
}
