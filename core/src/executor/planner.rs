use std::collections::BTreeMap;

use crate::error::ExecutorError;

use super::inference::DependencyInferencer;
use super::types::{DependencyMode, DependencySource, Plan, PlanInput, Task, TaskId};

/// Turns plan input into a [`Plan`] using explicit or inferred edges.
pub struct Planner<'a> {
    inferencer: &'a DependencyInferencer,
}

impl<'a> Planner<'a> {
    pub fn new(inferencer: &'a DependencyInferencer) -> Self {
        Self { inferencer }
    }

    /// Concrete edge source for `mode` given this input.
    pub fn resolve_mode(input: &PlanInput, mode: DependencyMode) -> DependencySource {
        match mode {
            DependencyMode::Explicit => DependencySource::Explicit,
            DependencyMode::Inferred => DependencySource::Inferred,
            DependencyMode::Auto => {
                if input.tasks.iter().any(|t| t.declares_dependencies()) {
                    DependencySource::Explicit
                } else {
                    DependencySource::Inferred
                }
            }
        }
    }

    pub fn build(&self, input: &PlanInput, mode: DependencyMode) -> Result<Plan, ExecutorError> {
        let source = Self::resolve_mode(input, mode);

        let dependencies: BTreeMap<TaskId, Vec<TaskId>> = match source {
            DependencySource::Explicit => input
                .tasks
                .iter()
                .map(|spec| (spec.id, spec.depends_on.clone().unwrap_or_default()))
                .collect(),
            DependencySource::Inferred => {
                let tasks: Vec<Task> = input.tasks.iter().map(Task::from_spec).collect();
                self.inferencer.infer_edges(&tasks)?
            }
        };

        let plan = Plan::assemble(&input.request, &input.tasks, dependencies, source);
        tracing::debug!(
            plan_id = %plan.id,
            tasks = plan.tasks.len(),
            source = ?source,
            complexity = plan.complexity.as_str(),
            "plan built"
        );
        Ok(plan)
    }
}
