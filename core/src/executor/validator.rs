//! Plan validation: cycles, dangling references, unknown capabilities.
//!
//! Validation is read-only and collects every issue in one pass, so the
//! caller gets a complete diagnostic instead of the first failure.

use serde::Serialize;

use super::graph::{format_cycle_path, TaskGraph};
use super::registry::CapabilityRegistry;
use super::types::{Plan, Task, TaskId};

/// One problem found in a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    DuplicateTaskId { task_id: TaskId },
    CircularDependency { path: Vec<TaskId> },
    InvalidDependency { task_id: TaskId, missing_dep: TaskId },
    CapabilityUnavailable { task_id: TaskId, capability: String },
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateTaskId { task_id } => write!(f, "duplicate task id: {}", task_id),
            Self::CircularDependency { path } => {
                write!(f, "circular dependency: {}", format_cycle_path(path))
            }
            Self::InvalidDependency {
                task_id,
                missing_dep,
            } => write!(
                f,
                "invalid dependency: task {} depends on unknown task {}",
                task_id, missing_dep
            ),
            Self::CapabilityUnavailable {
                task_id,
                capability,
            } => write!(
                f,
                "capability unavailable: task {} requires '{}'",
                task_id, capability
            ),
        }
    }
}

/// Verdict of [`PlanValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.to_string()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct PlanValidator<'a> {
    registry: &'a CapabilityRegistry,
}

impl<'a> PlanValidator<'a> {
    pub fn new(registry: &'a CapabilityRegistry) -> Self {
        Self { registry }
    }

    pub fn validate(&self, plan: &Plan) -> ValidationReport {
        self.validate_tasks(&plan.tasks)
    }

    /// Validate a task list whose `depends_on` fields carry the edge set.
    pub fn validate_tasks(&self, tasks: &[Task]) -> ValidationReport {
        let graph = TaskGraph::from_tasks(tasks);
        let mut issues = Vec::new();

        for task_id in graph.duplicate_ids() {
            issues.push(ValidationIssue::DuplicateTaskId { task_id: *task_id });
        }

        for path in graph.find_cycles() {
            issues.push(ValidationIssue::CircularDependency { path });
        }

        for (task_id, missing_dep) in graph.missing_dependencies() {
            issues.push(ValidationIssue::InvalidDependency {
                task_id,
                missing_dep,
            });
        }

        for task in tasks {
            if !self.registry.contains(&task.capability) {
                issues.push(ValidationIssue::CapabilityUnavailable {
                    task_id: task.id,
                    capability: task.capability.clone(),
                });
            }
        }

        if !issues.is_empty() {
            tracing::debug!(issues = issues.len(), "plan rejected");
        }

        ValidationReport {
            valid: issues.is_empty(),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::traits::{Capability, FnCapability};
    use crate::executor::types::{ArgMap, TaskSpec};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn registry() -> CapabilityRegistry {
        let echo: Arc<dyn Capability> =
            Arc::new(FnCapability::new("echo", |_args: &ArgMap| Ok(json!(null))));
        CapabilityRegistry::new().with(echo)
    }

    fn task(id: TaskId, capability: &str, deps: &[TaskId]) -> Task {
        Task::from_spec(&TaskSpec::new(id, capability).depends_on(deps.to_vec()))
    }

    #[test]
    fn test_valid_plan() {
        let registry = registry();
        let tasks = vec![task(1, "echo", &[]), task(2, "echo", &[1])];
        let report = PlanValidator::new(&registry).validate_tasks(&tasks);
        assert!(report.valid);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_cycle_rejected() {
        let registry = registry();
        let tasks = vec![task(1, "echo", &[2]), task(2, "echo", &[1])];
        let report = PlanValidator::new(&registry).validate_tasks(&tasks);
        assert!(!report.valid);
        assert_eq!(report.messages(), vec!["circular dependency: 1 -> 2 -> 1"]);
    }

    #[test]
    fn test_all_issues_collected() {
        let registry = registry();
        let tasks = vec![
            task(1, "echo", &[]),
            task(2, "web_search", &[1]),
            task(3, "echo", &[9]),
        ];
        let report = PlanValidator::new(&registry).validate_tasks(&tasks);
        assert!(!report.valid);
        assert_eq!(
            report.messages(),
            vec![
                "invalid dependency: task 3 depends on unknown task 9",
                "capability unavailable: task 2 requires 'web_search'",
            ]
        );
    }

    #[test]
    fn test_duplicate_id_reported() {
        let registry = registry();
        let tasks = vec![task(4, "echo", &[]), task(4, "echo", &[])];
        let report = PlanValidator::new(&registry).validate_tasks(&tasks);
        assert_eq!(report.messages(), vec!["duplicate task id: 4"]);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let registry = registry();
        let tasks = vec![
            task(1, "echo", &[3]),
            task(2, "missing", &[1]),
            task(3, "echo", &[2]),
        ];
        let validator = PlanValidator::new(&registry);
        let first = validator.validate_tasks(&tasks);
        let second = validator.validate_tasks(&tasks);
        assert_eq!(first, second);
        assert!(!first.valid);
    }
}
