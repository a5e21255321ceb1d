//! Strata build orchestration
//!
//! Turns a configured project graph into an executed build:
//! - Stable topological ordering of modules and tasks
//! - Task plans with parallel levels and a plan fingerprint
//! - Built-in task actions (shell commands, deletes, no-ops, closures)
//! - Parallel execution on a worker pool with partial-failure semantics
//! - Per-task and per-module results
//!
//! # Example
//!
//! ```no_run
//! use strata_build::{OrchestrationEngine, Selection};
//! use strata_config::{ConfigLoader, LoadOptions};
//! use std::path::Path;
//!
//! let config = ConfigLoader::new()
//!     .load_from_directory(Path::new("."), &LoadOptions::default())
//!     .unwrap();
//! let mut engine = OrchestrationEngine::new(config.settings.clone())
//!     .with_selection(Selection::all().with_task("build"));
//! let result = engine.evaluate(&config.graph).unwrap();
//! std::process::exit(result.exit_code() as i32);
//! ```

pub mod action;
pub mod engine;
pub mod error;
pub mod graph;
pub mod log;
pub mod plan;
pub mod result;
pub mod task;

// Re-export main types
pub use action::{DeleteAction, FnAction, NoopAction, ShellAction};
pub use engine::{OrchestrationEngine, Selection, CLEAN_TASK};
pub use error::{BuildError, BuildResult, GraphKind};
pub use graph::DependencyGraph;
pub use log::{ExecutionLog, LogEntry, LogEvent};
pub use plan::{PlanSummary, PlannedTask, TaskGraphBuilder, TaskPlan};
pub use result::{ExecutionResult, ModuleState, TaskOutcome, TaskStatus};
pub use task::{Task, TaskAction, TaskContext};
