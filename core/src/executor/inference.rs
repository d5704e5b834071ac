//! Dependency inference for tasks that do not declare their edges.
//!
//! A pair of tasks is compared in submission order (`earlier`, `later`).
//! The pair is independent only when a commuting-pair entry or a predicate
//! positively says so and no predicate reports a conflict. Everything else
//! is treated as a dependency of `later` on `earlier`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::config::InferenceConfig;
use crate::error::ExecutorError;

use super::args::referenced_tasks;
use super::traits::{ConflictPredicate, PairVerdict};
use super::types::{Task, TaskId};

/// Result of [`DependencyInferencer::partition`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    /// Tasks that conflict with nothing else; safe to run as one batch.
    pub independent: Vec<TaskId>,
    /// Tasks that conflict with at least one other, in submission order.
    pub dependent: Vec<TaskId>,
    /// Inferred edges: task id -> earlier tasks it must wait for.
    pub edges: BTreeMap<TaskId, Vec<TaskId>>,
}

impl Partition {
    pub fn dependencies(&self, task_id: TaskId) -> &[TaskId] {
        self.edges.get(&task_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub struct DependencyInferencer {
    commuting: HashSet<(String, String)>,
    predicates: Vec<Arc<dyn ConflictPredicate>>,
}

impl DependencyInferencer {
    /// Inferencer with no commuting pairs and no predicates: every pair is
    /// treated as dependent.
    pub fn new() -> Self {
        Self {
            commuting: HashSet::new(),
            predicates: Vec::new(),
        }
    }

    /// Inferencer with the configured commuting table and the resource predicate.
    pub fn from_config(cfg: &InferenceConfig) -> Self {
        let mut inferencer = Self::new();
        for [a, b] in &cfg.commuting_pairs {
            inferencer.add_commuting_pair(a, b);
        }
        inferencer.with_predicate(Arc::new(ResourceConflictPredicate::from_config(cfg)))
    }

    pub fn add_commuting_pair(&mut self, a: &str, b: &str) {
        self.commuting.insert(pair_key(a, b));
    }

    pub fn with_commuting_pair(mut self, a: &str, b: &str) -> Self {
        self.add_commuting_pair(a, b);
        self
    }

    pub fn with_predicate(mut self, predicate: Arc<dyn ConflictPredicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicate_names(&self) -> Vec<&str> {
        self.predicates.iter().map(|p| p.name()).collect()
    }

    pub fn commutes(&self, a: &str, b: &str) -> bool {
        self.commuting.contains(&pair_key(a, b))
    }

    /// Does `later` have to wait for `earlier`?
    ///
    /// A predicate error aborts inference; callers fall back to sequential
    /// execution.
    pub fn conflicts(&self, earlier: &Task, later: &Task) -> Result<bool, ExecutorError> {
        // `${task.N}` in the later task's args is a data dependency
        if referenced_tasks(&later.args).contains(&earlier.id) {
            return Ok(true);
        }
        if self.commutes(&earlier.capability, &later.capability) {
            return Ok(false);
        }

        let mut independent = false;
        for predicate in &self.predicates {
            let verdict = predicate.check(earlier, later).map_err(|e| {
                ExecutorError::SchedulingFallback(format!(
                    "predicate '{}' failed on tasks {} and {}: {}",
                    predicate.name(),
                    earlier.id,
                    later.id,
                    e
                ))
            })?;
            match verdict {
                PairVerdict::Conflict => {
                    tracing::trace!(
                        predicate = predicate.name(),
                        earlier = earlier.id,
                        later = later.id,
                        "conflict"
                    );
                    return Ok(true);
                }
                PairVerdict::Independent => independent = true,
                PairVerdict::Unknown => {}
            }
        }

        // Conservative default: independence must be established
        Ok(!independent)
    }

    /// Inferred dependency map for every task (empty lists included).
    pub fn infer_edges(
        &self,
        tasks: &[Task],
    ) -> Result<BTreeMap<TaskId, Vec<TaskId>>, ExecutorError> {
        let mut edges: BTreeMap<TaskId, Vec<TaskId>> = BTreeMap::new();

        for (j, later) in tasks.iter().enumerate() {
            let mut deps = Vec::new();
            for earlier in &tasks[..j] {
                if self.conflicts(earlier, later)? {
                    deps.push(earlier.id);
                }
            }
            edges.insert(later.id, deps);
        }

        Ok(edges)
    }

    /// Split tasks into a provably independent group and a serialized group.
    pub fn partition(&self, tasks: &[Task]) -> Result<Partition, ExecutorError> {
        let all_edges = self.infer_edges(tasks)?;

        let mut involved: HashSet<TaskId> = HashSet::new();
        for (task_id, deps) in &all_edges {
            if !deps.is_empty() {
                involved.insert(*task_id);
                involved.extend(deps.iter().copied());
            }
        }

        let mut partition = Partition::default();
        for task in tasks {
            if involved.contains(&task.id) {
                partition.dependent.push(task.id);
                let deps = all_edges.get(&task.id).cloned().unwrap_or_default();
                if !deps.is_empty() {
                    partition.edges.insert(task.id, deps);
                }
            } else {
                partition.independent.push(task.id);
            }
        }

        tracing::debug!(
            independent = partition.independent.len(),
            dependent = partition.dependent.len(),
            "tasks partitioned"
        );

        Ok(partition)
    }
}

impl Default for DependencyInferencer {
    fn default() -> Self {
        Self::from_config(&InferenceConfig::default())
    }
}

impl std::fmt::Debug for DependencyInferencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyInferencer")
            .field("commuting", &self.commuting.len())
            .field("predicates", &self.predicate_names())
            .finish()
    }
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Write-then-reference conflict check over named resources.
///
/// A task's resources are the string values of its `resource_keys`
/// arguments. A writer conflicts with any other task whose arguments name
/// one of its resources, either under the same key or as a substring of
/// any argument text.
#[derive(Debug, Clone)]
pub struct ResourceConflictPredicate {
    read_only: HashSet<String>,
    writers: HashSet<String>,
    resource_keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
    Unclassified,
}

impl ResourceConflictPredicate {
    pub fn new(
        read_only: impl IntoIterator<Item = String>,
        writers: impl IntoIterator<Item = String>,
        resource_keys: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            read_only: read_only.into_iter().collect(),
            writers: writers.into_iter().collect(),
            resource_keys: resource_keys.into_iter().collect(),
        }
    }

    pub fn from_config(cfg: &InferenceConfig) -> Self {
        Self::new(
            cfg.read_only_capabilities.iter().cloned(),
            cfg.write_capabilities.iter().cloned(),
            cfg.resource_keys.iter().cloned(),
        )
    }

    fn access(&self, task: &Task) -> Access {
        if self.writers.contains(&task.capability) {
            Access::Write
        } else if self.read_only.contains(&task.capability) {
            Access::Read
        } else {
            Access::Unclassified
        }
    }

    fn resources<'t>(&self, task: &'t Task) -> Vec<(&'t str, &'t str)> {
        self.resource_keys
            .iter()
            .filter_map(|key| {
                let (k, v) = task.args.get_key_value(key)?;
                v.as_str()
                    .filter(|s| !s.is_empty())
                    .map(|s| (k.as_str(), s))
            })
            .collect()
    }

    /// Does `other` reference any resource of `writer`?
    fn references(&self, writer: &Task, other: &Task) -> bool {
        let texts = other.arg_strings();
        self.resources(writer).into_iter().any(|(key, resource)| {
            let exact = other.args.get(key).and_then(|v| v.as_str()) == Some(resource);
            exact || texts.iter().any(|text| text.contains(resource))
        })
    }
}

impl ConflictPredicate for ResourceConflictPredicate {
    fn name(&self) -> &str {
        "resource"
    }

    fn check(&self, earlier: &Task, later: &Task) -> Result<PairVerdict, ExecutorError> {
        let a = self.access(earlier);
        let b = self.access(later);

        if a == Access::Read && b == Access::Read {
            return Ok(PairVerdict::Independent);
        }

        if a == Access::Write && self.references(earlier, later) {
            return Ok(PairVerdict::Conflict);
        }
        if b == Access::Write && self.references(later, earlier) {
            return Ok(PairVerdict::Conflict);
        }

        if a == Access::Unclassified || b == Access::Unclassified {
            return Ok(PairVerdict::Unknown);
        }

        // Writer whose resources are unknown may touch anything
        let writer_without_resource = (a == Access::Write && self.resources(earlier).is_empty())
            || (b == Access::Write && self.resources(later).is_empty());
        if writer_without_resource {
            return Ok(PairVerdict::Unknown);
        }

        Ok(PairVerdict::Independent)
    }
}
