//! Execution results

use crate::error::{BuildError, BuildResult};
use crate::log::LogEntry;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Lifecycle of a module during a run
///
/// `Unevaluated -> Evaluating -> Merged -> Planned -> Executed | Failed`.
/// A module whose configuration cannot be merged goes straight from
/// `Evaluating` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleState {
    Unevaluated,
    Evaluating,
    Merged,
    Planned,
    Executed,
    Failed,
}

impl ModuleState {
    /// Check if `self -> next` is a legal transition
    pub fn can_transition(self, next: ModuleState) -> bool {
        use ModuleState::*;
        matches!(
            (self, next),
            (Unevaluated, Evaluating)
                | (Evaluating, Merged)
                | (Evaluating, Failed)
                | (Merged, Planned)
                | (Planned, Executed)
                | (Planned, Failed)
        )
    }
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unevaluated => "unevaluated",
            Self::Evaluating => "evaluating",
            Self::Merged => "merged",
            Self::Planned => "planned",
            Self::Executed => "executed",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Final status of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "kebab-case")]
pub enum TaskStatus {
    Success,
    Failed(String),
    Skipped(String),
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
            Self::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Outcome of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskOutcome {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(flatten)]
    pub status: TaskStatus,
    pub duration_ms: u64,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Plan fingerprint
    pub fingerprint: String,
    /// Task outcomes in plan order
    pub tasks: Vec<TaskOutcome>,
    /// Final state per module
    pub modules: BTreeMap<String, ModuleState>,
    /// Wall-clock time of the execution phase
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    pub elapsed: Duration,
    /// Task events in the order they were recorded
    pub log: Vec<LogEntry>,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl ExecutionResult {
    /// Status of a task
    pub fn status(&self, id: &str) -> Option<&TaskStatus> {
        self.tasks.iter().find(|t| t.id == id).map(|t| &t.status)
    }

    /// Final state of a module
    pub fn module_state(&self, name: &str) -> Option<ModuleState> {
        self.modules.get(name).copied()
    }

    /// Check if every task succeeded
    pub fn succeeded(&self) -> bool {
        self.tasks.iter().all(|t| t.status.is_success())
    }

    /// Number of tasks that succeeded
    pub fn success_count(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Success))
    }

    /// Number of tasks that failed
    pub fn failure_count(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Failed(_)))
    }

    /// Number of tasks that were skipped
    pub fn skipped_count(&self) -> usize {
        self.count(|s| matches!(s, TaskStatus::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&TaskStatus) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(&t.status)).count()
    }

    /// Process exit code: `0` if every task succeeded, `1` otherwise
    pub fn exit_code(&self) -> u8 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }

    /// Convert to an error naming the first failed task
    pub fn into_result(self) -> BuildResult<Self> {
        let failure = self.tasks.iter().find_map(|t| match &t.status {
            TaskStatus::Failed(reason) => Some(BuildError::task_failed(&t.id, reason)),
            _ => None,
        });
        match failure {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }
}
