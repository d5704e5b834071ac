use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::ExecutorError;
use crate::executor::types::{TaskId, TaskLike};

/// Task dependency graph (DAG once validated)
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    /// Dependency edges: task_id -> list of dependencies (deduplicated)
    pub edges: HashMap<TaskId, Vec<TaskId>>,

    /// Reverse edges: task_id -> list of tasks that depend on it
    pub reverse_edges: HashMap<TaskId, Vec<TaskId>>,

    /// Original insertion order (for stable batching)
    insertion_order: Vec<TaskId>,

    /// task_id -> position in insertion order
    positions: HashMap<TaskId, usize>,

    /// Ids seen more than once; only the first occurrence is kept
    duplicates: Vec<TaskId>,
}

impl TaskGraph {
    /// Construct task graph from tasks carrying their own dependency lists
    pub fn from_tasks<T: TaskLike>(tasks: &[T]) -> Self {
        let mut graph = Self::default();
        for task in tasks {
            graph.add_node(task.id(), task.dependencies());
        }
        graph
    }

    /// Construct task graph from an id order plus a dependency map
    pub fn from_edges(order: &[TaskId], dependencies: &BTreeMap<TaskId, Vec<TaskId>>) -> Self {
        let mut graph = Self::default();
        for id in order {
            let deps = dependencies.get(id).map(Vec::as_slice).unwrap_or(&[]);
            graph.add_node(*id, deps);
        }
        graph
    }

    fn add_node(&mut self, task_id: TaskId, dependencies: &[TaskId]) {
        if self.positions.contains_key(&task_id) {
            self.duplicates.push(task_id);
            return;
        }

        let mut deps: Vec<TaskId> = Vec::with_capacity(dependencies.len());
        for dep in dependencies {
            if !deps.contains(dep) {
                deps.push(*dep);
            }
        }

        for dep in &deps {
            self.reverse_edges.entry(*dep).or_default().push(task_id);
        }

        self.positions.insert(task_id, self.insertion_order.len());
        self.insertion_order.push(task_id);
        self.edges.insert(task_id, deps);
    }

    pub fn contains(&self, task_id: TaskId) -> bool {
        self.positions.contains_key(&task_id)
    }

    pub fn len(&self) -> usize {
        self.insertion_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertion_order.is_empty()
    }

    pub fn task_ids(&self) -> &[TaskId] {
        &self.insertion_order
    }

    pub fn dependencies(&self, task_id: TaskId) -> &[TaskId] {
        self.edges.get(&task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents(&self, task_id: TaskId) -> &[TaskId] {
        self.reverse_edges
            .get(&task_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn duplicate_ids(&self) -> &[TaskId] {
        &self.duplicates
    }

    /// Every `(task, missing dependency)` pair, in insertion order
    pub fn missing_dependencies(&self) -> Vec<(TaskId, TaskId)> {
        let mut missing = Vec::new();
        for task_id in &self.insertion_order {
            for dep in self.dependencies(*task_id) {
                if !self.contains(*dep) {
                    missing.push((*task_id, *dep));
                }
            }
        }
        missing
    }

    /// Validate dependency relationships, stopping at the first problem
    pub fn validate(&self) -> Result<(), ExecutorError> {
        if let Some(dup) = self.duplicates.first() {
            return Err(ExecutorError::DuplicateTaskId(*dup));
        }

        if let Some((task_id, missing_dep)) = self.missing_dependencies().into_iter().next() {
            return Err(ExecutorError::DependencyNotFound {
                task_id,
                missing_dep,
            });
        }

        if let Some(cycle) = self.find_cycles().first() {
            return Err(ExecutorError::CircularDependency(format_cycle_path(cycle)));
        }

        Ok(())
    }

    /// Detect circular dependencies using DFS with a recursion-stack marker
    ///
    /// Every back-edge into the current stack yields one cycle path
    /// (`[a, b, ..., a]`). Missing dependencies are ignored here.
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    pub fn find_cycles(&self) -> Vec<Vec<TaskId>> {
        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut stack = Vec::new();
        let mut cycles = Vec::new();

        for task_id in &self.insertion_order {
            if !visited.contains(task_id) {
                self.dfs_cycle(
                    *task_id,
                    &mut visited,
                    &mut on_stack,
                    &mut stack,
                    &mut cycles,
                );
            }
        }

        cycles
    }

    pub fn has_cycle(&self) -> bool {
        !self.find_cycles().is_empty()
    }

    fn dfs_cycle(
        &self,
        node: TaskId,
        visited: &mut HashSet<TaskId>,
        on_stack: &mut HashSet<TaskId>,
        stack: &mut Vec<TaskId>,
        cycles: &mut Vec<Vec<TaskId>>,
    ) {
        visited.insert(node);
        on_stack.insert(node);
        stack.push(node);

        for dep in self.dependencies(node) {
            if !self.contains(*dep) {
                continue;
            }

            // Back-edge into the current path
            if on_stack.contains(dep) {
                if let Some(pos) = stack.iter().position(|x| x == dep) {
                    let mut cycle = stack[pos..].to_vec();
                    cycle.push(*dep);
                    cycles.push(cycle);
                }
                continue;
            }

            if !visited.contains(dep) {
                self.dfs_cycle(*dep, visited, on_stack, stack, cycles);
            }
        }

        stack.pop();
        on_stack.remove(&node);
    }

    /// Topological batching using Kahn's algorithm
    ///
    /// Returns ordered batches where tasks in the same batch can run in
    /// parallel. Within a batch, tasks keep their insertion order. Tasks on a
    /// cycle (and everything downstream of one) never reach in-degree zero and
    /// are left out, so a cyclic graph yields a strict subset of its tasks.
    ///
    /// # Algorithm
    ///
    /// 1. Calculate in-degree for all nodes
    /// 2. Collect all nodes with in-degree 0 (first batch)
    /// 3. Remove these nodes and update in-degrees
    /// 4. Repeat until the frontier is empty
    ///
    /// # Time Complexity
    ///
    /// O(V + E) where V = number of tasks, E = number of dependencies
    pub fn batches(&self) -> Vec<Vec<TaskId>> {
        let mut in_degree: HashMap<TaskId, usize> = HashMap::with_capacity(self.len());

        // edges[A] = [B, C] means A depends on B and C
        // In execution graph: B -> A, C -> A
        // So A's in-degree = 2 (dangling dependencies do not count)
        for task_id in &self.insertion_order {
            let degree = self
                .dependencies(*task_id)
                .iter()
                .filter(|dep| self.contains(**dep))
                .count();
            in_degree.insert(*task_id, degree);
        }

        let mut batches: Vec<Vec<TaskId>> = Vec::new();
        let mut current: Vec<TaskId> = self
            .insertion_order
            .iter()
            .filter(|id| in_degree.get(id).copied() == Some(0))
            .copied()
            .collect();

        while !current.is_empty() {
            let mut next = Vec::new();

            for task_id in &current {
                for dependent in self.dependents(*task_id) {
                    if let Some(degree) = in_degree.get_mut(dependent) {
                        *degree = degree.saturating_sub(1);
                        if *degree == 0 {
                            next.push(*dependent);
                        }
                    }
                }
            }

            // Preserve input order
            next.sort_by_key(|id| self.positions.get(id).copied().unwrap_or(usize::MAX));

            batches.push(std::mem::take(&mut current));
            current = next;
        }

        batches
    }

    /// Strict topological batching: fails unless every task was scheduled
    pub fn topological_sort(&self) -> Result<Vec<Vec<TaskId>>, ExecutorError> {
        let batches = self.batches();
        let scheduled: usize = batches.iter().map(Vec::len).sum();

        if scheduled != self.len() {
            let placed: HashSet<TaskId> = batches.iter().flatten().copied().collect();
            let stuck: Vec<String> = self
                .insertion_order
                .iter()
                .filter(|id| !placed.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(ExecutorError::CircularDependency(format!(
                "unable to schedule tasks {} (cycle detected)",
                stuck.join(", ")
            )));
        }

        Ok(batches)
    }
}

/// Batch index of every scheduled task
pub fn batch_index(batches: &[Vec<TaskId>]) -> HashMap<TaskId, usize> {
    let mut index = HashMap::new();
    for (batch_id, batch) in batches.iter().enumerate() {
        for task_id in batch {
            index.insert(*task_id, batch_id);
        }
    }
    index
}

pub fn format_cycle_path(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
