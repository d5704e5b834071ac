use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::task::{Task, TaskId, TaskSpec};

/// JSON plan file: the originating request plus its task specifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    #[serde(default)]
    pub request: String,
    pub tasks: Vec<TaskSpec>,
}

/// Complexity classification derived from the request text only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

const SIMPLE_MAX_WORDS: usize = 12;
const COMPLEX_MIN_WORDS: usize = 40;

fn step_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(then|after that|afterwards|finally|next|and also|followed by)\b")
            .expect("valid step marker regex")
    })
}

fn heavy_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(refactor|migrate|architecture|redesign|entire|whole|across|multiple|integrate|pipeline|system)\b",
        )
        .expect("valid keyword regex")
    })
}

impl Complexity {
    /// Classify a request by length, multi-step connectives and heavyweight keywords.
    pub fn classify(request: &str) -> Self {
        let words = request.split_whitespace().count();
        let steps = step_marker_re().find_iter(request).count();
        let heavy = heavy_keyword_re().find_iter(request).count();

        if words >= COMPLEX_MIN_WORDS || steps >= 2 || (heavy >= 1 && steps >= 1) || heavy >= 2 {
            Complexity::Complex
        } else if words <= SIMPLE_MAX_WORDS && steps == 0 && heavy == 0 {
            Complexity::Simple
        } else {
            Complexity::Medium
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
        }
    }
}

/// Where a plan's dependency map came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DependencySource {
    Explicit,
    Inferred,
}

/// An ordered collection of tasks plus their dependency relationships.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub request: String,
    pub tasks: Vec<Task>,
    /// task id -> ids it depends on
    pub dependencies: BTreeMap<TaskId, Vec<TaskId>>,
    pub dependency_source: DependencySource,
    pub complexity: Complexity,
    pub estimated_duration: u64,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    /// Assemble a plan whose tasks carry exactly the given dependency map.
    pub fn assemble(
        request: &str,
        specs: &[TaskSpec],
        dependencies: BTreeMap<TaskId, Vec<TaskId>>,
        dependency_source: DependencySource,
    ) -> Self {
        let tasks: Vec<Task> = specs
            .iter()
            .map(|spec| {
                let deps = dependencies.get(&spec.id).cloned().unwrap_or_default();
                Task::from_spec(spec).with_dependencies(deps)
            })
            .collect();
        let estimated_duration = tasks.iter().map(|t| t.estimated_duration).sum();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request: request.to_string(),
            tasks,
            dependencies,
            dependency_source,
            complexity: Complexity::classify(request),
            estimated_duration,
            created_at: Utc::now(),
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|t| t.id).collect()
    }

    /// Human-readable outline of the plan.
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        let _ = writeln!(
            out,
            "Plan {} ({}, {} tasks, ~{} estimated, {} dependencies)",
            self.id,
            self.complexity.as_str(),
            self.tasks.len(),
            self.estimated_duration,
            match self.dependency_source {
                DependencySource::Explicit => "explicit",
                DependencySource::Inferred => "inferred",
            }
        );
        if !self.request.is_empty() {
            let _ = writeln!(out, "Request: {}", self.request);
        }
        for task in &self.tasks {
            let deps = if task.depends_on.is_empty() {
                String::new()
            } else {
                let ids: Vec<String> = task.depends_on.iter().map(|d| d.to_string()).collect();
                format!(" (after {})", ids.join(", "))
            };
            let _ = writeln!(
                out,
                "  {}. [{}] {}{}",
                task.id, task.capability, task.description, deps
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_complexity_simple() {
        assert_eq!(Complexity::classify("read the README"), Complexity::Simple);
    }

    #[test]
    fn test_complexity_medium() {
        assert_eq!(
            Complexity::classify("search the web for tokio semaphore docs then summarize"),
            Complexity::Medium
        );
        assert_eq!(
            Complexity::classify(
                "look at the failing test in the parser module and explain what the assertion checks"
            ),
            Complexity::Medium
        );
    }

    #[test]
    fn test_complexity_complex() {
        assert_eq!(
            Complexity::classify("read the config, then update the loader, then run the tests"),
            Complexity::Complex
        );
        assert_eq!(
            Complexity::classify("refactor the entire storage layer"),
            Complexity::Complex
        );
    }

    #[test]
    fn test_assemble_sums_estimates_and_applies_edges() {
        let specs = vec![
            TaskSpec::new(1, "web_search").with_estimate(3),
            TaskSpec::new(2, "write_file").with_estimate(4),
        ];
        let mut deps = BTreeMap::new();
        deps.insert(2, vec![1]);
        let plan = Plan::assemble("look it up", &specs, deps, DependencySource::Explicit);

        assert_eq!(plan.estimated_duration, 7);
        assert_eq!(plan.task(2).map(|t| t.depends_on.clone()), Some(vec![1]));
        assert!(plan.task(1).map(|t| t.depends_on.is_empty()).unwrap_or(false));
        assert_eq!(plan.task_ids(), vec![1, 2]);
    }

    #[test]
    fn test_summary_lists_tasks() {
        let specs = vec![
            TaskSpec::new(1, "web_search").with_description("find docs"),
            TaskSpec::new(2, "write_file")
                .with_description("save notes")
                .depends_on([1]),
        ];
        let mut deps = BTreeMap::new();
        deps.insert(2, vec![1]);
        let plan = Plan::assemble("", &specs, deps, DependencySource::Explicit);
        let summary = plan.summary();

        assert!(summary.contains("1. [web_search] find docs"));
        assert!(summary.contains("2. [write_file] save notes (after 1)"));
    }
}
