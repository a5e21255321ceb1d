/// Build orchestration error types
use std::fmt;
use strata_config::ConfigError;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// Which dependency graph an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphKind {
    /// Module evaluation order (`parent` and `depends-on`)
    Module,
    /// Task execution order (`depends-on` between tasks)
    Task,
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module => write!(f, "module"),
            Self::Task => write!(f, "task"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cyclic dependency between {kind}s: {}", format_cycle(.cycle))]
    CyclicDependency { kind: GraphKind, cycle: Vec<String> },

    #[error("{kind} '{from}' depends on unknown {kind} '{missing}'")]
    MissingDependencyReference {
        kind: GraphKind,
        from: String,
        missing: String,
    },

    #[error("Duplicate {kind} '{id}'")]
    Duplicate { kind: GraphKind, id: String },

    #[error("Task '{task}' failed: {reason}")]
    TaskExecutionFailure { task: String, reason: String },

    #[error("Nothing to run: no {0}")]
    EmptySelection(String),

    #[error("Module '{module}' cannot move from {from} to {to}")]
    InvalidTransition {
        module: String,
        from: String,
        to: String,
    },

    #[error("Failed to start worker pool: {0}")]
    WorkerPool(String),
}

fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => format!("{} -> {}", cycle.join(" -> "), first),
        None => String::new(),
    }
}

impl BuildError {
    /// Create a cycle error
    pub fn cycle(kind: GraphKind, cycle: Vec<String>) -> Self {
        Self::CyclicDependency { kind, cycle }
    }

    /// Create a missing reference error
    pub fn missing_reference(
        kind: GraphKind,
        from: impl Into<String>,
        missing: impl Into<String>,
    ) -> Self {
        Self::MissingDependencyReference {
            kind,
            from: from.into(),
            missing: missing.into(),
        }
    }

    /// Create a task failure error
    pub fn task_failed(task: impl Into<String>, reason: impl ToString) -> Self {
        Self::TaskExecutionFailure {
            task: task.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code for this error
    ///
    /// `1` when work was attempted and did not complete, `2` when the
    /// project could not be configured or planned.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::TaskExecutionFailure { .. } | Self::WorkerPool(_) => 1,
            Self::Config(_)
            | Self::CyclicDependency { .. }
            | Self::MissingDependencyReference { .. }
            | Self::Duplicate { .. }
            | Self::EmptySelection(_)
            | Self::InvalidTransition { .. } => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_closes_loop() {
        let err = BuildError::cycle(GraphKind::Task, vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Cyclic dependency between tasks: a -> b -> a");
    }

    #[test]
    fn test_missing_reference_message() {
        let err = BuildError::missing_reference(GraphKind::Task, "app:compile", "generate");
        assert_eq!(
            err.to_string(),
            "task 'app:compile' depends on unknown task 'generate'"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(BuildError::task_failed("build", "exit 1").exit_code(), 1);
        assert_eq!(BuildError::cycle(GraphKind::Module, vec!["a".into()]).exit_code(), 2);
        assert_eq!(
            BuildError::from(ConfigError::conflict("app", "a", "b", "clash")).exit_code(),
            2
        );
    }

    #[test]
    fn test_duplicate_message() {
        let err = BuildError::Duplicate {
            kind: GraphKind::Task,
            id: "clean".into(),
        };
        assert_eq!(err.to_string(), "Duplicate task 'clean'");
    }
}
