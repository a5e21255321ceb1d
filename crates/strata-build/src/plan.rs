//! Task planning
//!
//! `TaskGraphBuilder` turns a list of tasks into a `TaskPlan`: a
//! deterministic execution order, the parallel levels of that order and a
//! fingerprint identifying the plan's shape.

use crate::error::{BuildResult, GraphKind};
use crate::graph::DependencyGraph;
use crate::task::Task;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Builds task plans
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskGraphBuilder;

impl TaskGraphBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self
    }

    /// Order `tasks` for execution
    ///
    /// Every predecessor must be one of `tasks`. When several tasks are
    /// ready at the same time the one that appears first in `tasks` runs
    /// first.
    pub fn build(&self, tasks: Vec<Task>) -> BuildResult<TaskPlan> {
        let graph = DependencyGraph::new(
            GraphKind::Task,
            tasks.iter().map(|t| (t.id.as_str(), t.predecessors.clone())),
        )?;
        let order = graph.topological_order()?;

        // Re-index levels from declaration indices to plan positions
        let mut position = vec![0usize; tasks.len()];
        for (pos, &node) in order.iter().enumerate() {
            position[node] = pos;
        }
        let levels = graph
            .levels(&order)
            .into_iter()
            .map(|level| level.into_iter().map(|node| position[node]).collect())
            .collect();

        let mut slots: Vec<Option<Task>> = tasks.into_iter().map(Some).collect();
        let ordered = order
            .iter()
            .filter_map(|&node| slots[node].take())
            .collect();

        tracing::debug!(tasks = order.len(), "task plan built");
        Ok(TaskPlan {
            tasks: ordered,
            levels,
        })
    }

    /// Keep only `roots` and everything they transitively depend on
    ///
    /// Declaration order is preserved. Unknown predecessors are left for
    /// `build` to report.
    pub fn select(&self, tasks: Vec<Task>, roots: &[String]) -> Vec<Task> {
        let mut keep: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = roots.to_vec();

        while let Some(id) = stack.pop() {
            if !keep.insert(id.clone()) {
                continue;
            }
            if let Some(task) = tasks.iter().find(|t| t.id == id) {
                stack.extend(task.predecessors.iter().cloned());
            }
        }

        tasks.into_iter().filter(|t| keep.contains(&t.id)).collect()
    }
}

/// An ordered, validated set of tasks
#[derive(Debug, Clone)]
pub struct TaskPlan {
    /// Tasks in execution order
    tasks: Vec<Task>,
    /// Positions into `tasks`, grouped by level
    levels: Vec<Vec<usize>>,
}

impl TaskPlan {
    /// Tasks in execution order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Task ids in execution order
    pub fn ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.id.as_str()).collect()
    }

    /// Groups of mutually independent tasks, as positions into `tasks()`
    pub fn levels(&self) -> &[Vec<usize>] {
        &self.levels
    }

    /// Number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Check if the plan is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Position of a task in the execution order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == id)
    }

    /// Get a task by id
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// SHA-256 over the ordered task ids and their predecessors
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for task in &self.tasks {
            hasher.update(task.id.as_bytes());
            hasher.update(b"<-");
            hasher.update(task.predecessors.join(",").as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    /// Serializable summary of the plan
    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            fingerprint: self.fingerprint(),
            tasks: self
                .tasks
                .iter()
                .map(|t| PlannedTask {
                    id: t.id.clone(),
                    module: t.module().map(str::to_string),
                    depends_on: t.predecessors.clone(),
                    action: t.action.describe(),
                })
                .collect(),
            levels: self
                .levels
                .iter()
                .map(|level| level.iter().map(|&p| self.tasks[p].id.clone()).collect())
                .collect(),
        }
    }
}

/// Serializable view of a plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanSummary {
    pub fingerprint: String,
    pub tasks: Vec<PlannedTask>,
    pub levels: Vec<Vec<String>>,
}

/// One task in a plan summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedTask {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub action: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use pretty_assertions::assert_eq;

    fn task(id: &str, preds: &[&str]) -> Task {
        Task::new(id).with_predecessors(preds.iter().copied())
    }

    #[test]
    fn test_clean_before_build() {
        let plan = TaskGraphBuilder::new()
            .build(vec![task("clean", &[]), task("build", &["clean"])])
            .unwrap();
        assert_eq!(plan.ids(), vec!["clean", "build"]);
    }

    #[test]
    fn test_declaration_order_breaks_ties() {
        let plan = TaskGraphBuilder::new()
            .build(vec![
                task("package", &["build"]),
                task("lint", &[]),
                task("build", &[]),
            ])
            .unwrap();
        assert_eq!(plan.ids(), vec!["lint", "build", "package"]);
        assert_eq!(plan.levels(), &[vec![0, 1], vec![2]]);
    }

    #[test]
    fn test_levels_are_plan_positions() {
        let plan = TaskGraphBuilder::new()
            .build(vec![
                task("app:assemble", &["app:compile", "lib:compile"]),
                task("app:compile", &["lib:compile"]),
                task("lib:compile", &[]),
            ])
            .unwrap();
        assert_eq!(plan.ids(), vec!["lib:compile", "app:compile", "app:assemble"]);
        assert_eq!(plan.levels(), &[vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_cycle_rejected() {
        let result = TaskGraphBuilder::new().build(vec![task("a", &["b"]), task("b", &["a"])]);
        assert!(matches!(result, Err(BuildError::CyclicDependency { .. })));
    }

    #[test]
    fn test_missing_predecessor_rejected() {
        let result = TaskGraphBuilder::new().build(vec![task("build", &["generate"])]);
        assert!(matches!(
            result,
            Err(BuildError::MissingDependencyReference { missing, .. }) if missing == "generate"
        ));
    }

    #[test]
    fn test_select_pulls_in_predecessors() {
        let tasks = vec![
            task("clean", &[]),
            task("lint", &[]),
            task("build", &["clean"]),
            task("package", &["build"]),
        ];
        let selected = TaskGraphBuilder::new().select(tasks, &["package".to_string()]);
        let ids: Vec<&str> = selected.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["clean", "build", "package"]);
    }

    #[test]
    fn test_fingerprint_tracks_shape() {
        let builder = TaskGraphBuilder::new();
        let a = builder
            .build(vec![task("clean", &[]), task("build", &["clean"])])
            .unwrap();
        let b = builder
            .build(vec![task("clean", &[]), task("build", &["clean"])])
            .unwrap();
        let c = builder
            .build(vec![task("clean", &[]), task("build", &[])])
            .unwrap();

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_summary() {
        let plan = TaskGraphBuilder::new()
            .build(vec![task("clean", &[]), task("build", &["clean"])])
            .unwrap();
        let summary = plan.summary();
        assert_eq!(summary.levels, vec![vec!["clean"], vec!["build"]]);
        assert_eq!(summary.tasks[1].depends_on, vec!["clean"]);
        assert_eq!(summary.tasks[0].action, "no-op");
    }
}
