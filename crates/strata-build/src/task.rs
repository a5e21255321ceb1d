//! Tasks and their execution context

use crate::action::NoopAction;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Something a task does when it runs
///
/// Implementations run on worker threads and must not assume which thread
/// or in what order relative to tasks they do not depend on.
pub trait TaskAction: fmt::Debug + Send + Sync {
    /// Run the action, returning a failure reason on error
    fn execute(&self, ctx: &TaskContext) -> Result<(), String>;

    /// Short human-readable description
    fn describe(&self) -> String;
}

/// Everything an action may read while running
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskContext {
    /// Task id
    pub task_id: String,
    /// Owning module, `None` for project-wide tasks
    pub module: Option<String>,
    /// Working directory for commands
    pub working_dir: PathBuf,
    /// Build output directory of the owning module
    pub build_dir: PathBuf,
    /// Extra environment for spawned processes
    pub env: BTreeMap<String, String>,
}

/// A unit of work in the task graph
#[derive(Debug, Clone)]
pub struct Task {
    /// Unique id: `name` for project tasks, `module:name` for module tasks
    pub id: String,
    /// Ids of tasks that must succeed first
    pub predecessors: Vec<String>,
    /// Optional description
    pub description: Option<String>,
    /// What the task does
    pub action: Arc<dyn TaskAction>,
    /// Execution context handed to the action
    pub context: TaskContext,
}

impl Task {
    /// Create a task that does nothing
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            context: TaskContext {
                task_id: id.clone(),
                ..Default::default()
            },
            id,
            predecessors: Vec::new(),
            description: None,
            action: Arc::new(NoopAction),
        }
    }

    /// Set predecessors
    pub fn with_predecessors<I, S>(mut self, predecessors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.predecessors = predecessors.into_iter().map(Into::into).collect();
        self
    }

    /// Set the action
    pub fn with_action(mut self, action: impl TaskAction + 'static) -> Self {
        self.action = Arc::new(action);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the execution context (the task id is kept)
    pub fn with_context(mut self, context: TaskContext) -> Self {
        self.context = TaskContext {
            task_id: self.id.clone(),
            ..context
        };
        self
    }

    /// Owning module, if any
    pub fn module(&self) -> Option<&str> {
        self.context.module.as_deref()
    }

    /// Task name without the module prefix
    pub fn name(&self) -> &str {
        match self.id.split_once(':') {
            Some((_, name)) => name,
            None => &self.id,
        }
    }

    /// Run the task's action
    pub fn run(&self) -> Result<(), String> {
        self.action.execute(&self.context)
    }
}

/// Qualified id of a module task
pub fn task_id(module: Option<&str>, name: &str) -> String {
    match module {
        Some(module) => format!("{}:{}", module, name),
        None => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_ids() {
        assert_eq!(task_id(None, "clean"), "clean");
        assert_eq!(task_id(Some("app"), "compile"), "app:compile");
    }

    #[test]
    fn test_task_name_strips_module() {
        let task = Task::new("app:compile");
        assert_eq!(task.name(), "compile");
        assert_eq!(Task::new("clean").name(), "clean");
    }

    #[test]
    fn test_context_keeps_task_id() {
        let task = Task::new("app:compile").with_context(TaskContext {
            task_id: "other".into(),
            module: Some("app".into()),
            ..Default::default()
        });
        assert_eq!(task.context.task_id, "app:compile");
        assert_eq!(task.module(), Some("app"));
    }

    #[test]
    fn test_noop_task_succeeds() {
        assert_eq!(Task::new("lint").run(), Ok(()));
    }
}
