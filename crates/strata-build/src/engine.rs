//! Build orchestration
//!
//! The engine evaluates a project graph in three phases:
//!
//! 1. **Configure** - merge every module's configuration in dependency order
//! 2. **Plan** - turn declared tasks into a validated `TaskPlan` and apply the
//!    selection
//! 3. **Execute** - run plan levels on a worker pool, skipping tasks whose
//!    predecessors did not succeed
//!
//! Configuration, selection and cycle errors surface before any task runs.

use crate::action::{DeleteAction, ShellAction};
use crate::error::{BuildError, BuildResult, GraphKind};
use crate::graph::DependencyGraph;
use crate::log::{ExecutionLog, LogEvent};
use crate::plan::{TaskGraphBuilder, TaskPlan};
use crate::result::{ExecutionResult, ModuleState, TaskOutcome, TaskStatus};
use crate::task::{task_id, Task, TaskContext};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use strata_config::{BuildSettings, ConfigNode, MergedConfig, ProjectGraph, TaskSpec};

/// Name of the project-wide task that removes build output
pub const CLEAN_TASK: &str = "clean";

const CANCELLED: &str = "cancelled after an earlier failure";

/// Which tasks a run should execute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Only tasks owned by this module
    pub module: Option<String>,
    /// Only tasks with this name or id
    pub task: Option<String>,
}

impl Selection {
    /// Every task except `clean`
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one module
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Restrict to one task name or id
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Check if nothing is filtered
    pub fn is_all(&self) -> bool {
        self.module.is_none() && self.task.is_none()
    }

    /// Check if `task` is selected directly
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(module) = &self.module {
            if task.module() != Some(module.as_str()) {
                return false;
            }
        }
        match &self.task {
            Some(name) => task.id == *name || task.name() == name,
            None => task.name() != CLEAN_TASK,
        }
    }

    fn describe(&self) -> String {
        match (&self.module, &self.task) {
            (Some(module), Some(task)) => {
                format!("task named '{}' in module '{}'", task, module)
            }
            (None, Some(task)) => format!("task named '{}'", task),
            (Some(module), None) => format!("tasks in module '{}'", module),
            (None, None) => "tasks".to_string(),
        }
    }
}

/// Evaluates project graphs
#[derive(Debug)]
pub struct OrchestrationEngine {
    settings: BuildSettings,
    selection: Selection,
    states: BTreeMap<String, ModuleState>,
    configs: BTreeMap<String, MergedConfig>,
}

impl OrchestrationEngine {
    /// Create an engine running every task except `clean`
    pub fn new(settings: BuildSettings) -> Self {
        Self {
            settings,
            selection: Selection::all(),
            states: BTreeMap::new(),
            configs: BTreeMap::new(),
        }
    }

    /// Set the task selection
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Current state of a module
    pub fn module_state(&self, module: &str) -> Option<ModuleState> {
        self.states.get(module).copied()
    }

    /// Effective configuration of a module, once merged
    pub fn merged_config(&self, module: &str) -> Option<&MergedConfig> {
        self.configs.get(module)
    }

    /// Configure, plan and execute
    pub fn evaluate(&mut self, graph: &ProjectGraph) -> BuildResult<ExecutionResult> {
        let plan = self.plan(graph)?;
        self.execute(&plan)
    }

    /// Merge every module's configuration
    ///
    /// Modules are merged parent first, then after their declared
    /// dependencies, so a module only ever sees already merged ancestors.
    pub fn configure(&mut self, graph: &ProjectGraph) -> BuildResult<()> {
        graph.validate_build_dir()?;

        let modules = DependencyGraph::new(
            GraphKind::Module,
            graph
                .modules
                .iter()
                .map(|m| (m.name.as_str(), m.evaluation_dependencies())),
        )?;
        let order = modules.topological_order()?;

        self.configs.clear();
        self.states = graph
            .modules
            .iter()
            .map(|m| (m.name.clone(), ModuleState::Unevaluated))
            .collect();

        let root = graph.root_config()?;
        let merger = graph.merger();

        for index in order {
            let node = &graph.modules[index];
            self.transition(&node.name, ModuleState::Evaluating)?;

            let parent = match &node.parent {
                Some(parent) => self.configs.get(parent).ok_or_else(|| {
                    BuildError::missing_reference(GraphKind::Module, &node.name, parent)
                })?,
                None => &root,
            };

            match merger.merge(parent, node) {
                Ok(merged) => {
                    tracing::debug!(
                        module = %node.name,
                        lineage = %merged.lineage.join(" > "),
                        plugins = merged.plugins.len(),
                        options = merged.options.len(),
                        "merged module configuration"
                    );
                    self.configs.insert(node.name.clone(), merged);
                    self.transition(&node.name, ModuleState::Merged)?;
                }
                Err(e) => {
                    self.transition(&node.name, ModuleState::Failed)?;
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }

    /// Configure and plan without executing
    pub fn plan(&mut self, graph: &ProjectGraph) -> BuildResult<TaskPlan> {
        self.configure(graph)?;

        let root = graph.root_config()?;
        let tasks = self.collect_tasks(graph, &root);
        let builder = TaskGraphBuilder::new();

        // Problems anywhere in the graph abort the run, selected or not
        builder.build(tasks.clone())?;

        if let Some(module) = &self.selection.module {
            if !self.configs.contains_key(module) {
                return Err(BuildError::EmptySelection(format!(
                    "module named '{}'",
                    module
                )));
            }
        }
        let roots: Vec<String> = tasks
            .iter()
            .filter(|t| self.selection.matches(t))
            .map(|t| t.id.clone())
            .collect();
        if roots.is_empty() && !self.selection.is_all() {
            return Err(BuildError::EmptySelection(self.selection.describe()));
        }

        let plan = builder.build(builder.select(tasks, &roots))?;

        let merged: Vec<String> = self.states.keys().cloned().collect();
        for module in merged {
            self.transition(&module, ModuleState::Planned)?;
        }

        tracing::debug!(
            tasks = plan.len(),
            levels = plan.levels().len(),
            fingerprint = %plan.fingerprint(),
            "planned build"
        );
        Ok(plan)
    }

    /// Run a plan
    ///
    /// Each level runs in parallel. A task starts only once every
    /// predecessor succeeded; otherwise it is skipped. With `fail_fast`,
    /// the first failure also skips every task that has not started yet.
    pub fn execute(&mut self, plan: &TaskPlan) -> BuildResult<ExecutionResult> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.jobs.max(1))
            .thread_name(|i| format!("strata-worker-{}", i))
            .build()
            .map_err(|e| BuildError::WorkerPool(e.to_string()))?;

        let fail_fast = self.settings.fail_fast;
        let log = ExecutionLog::new();
        let cancelled = AtomicBool::new(false);
        let start = Instant::now();

        let mut statuses: HashMap<&str, TaskStatus> = HashMap::with_capacity(plan.len());
        let mut durations: HashMap<&str, u64> = HashMap::with_capacity(plan.len());

        for level in plan.levels() {
            let mut runnable: Vec<&Task> = Vec::with_capacity(level.len());

            for &position in level {
                let task = &plan.tasks()[position];
                let blocker = task
                    .predecessors
                    .iter()
                    .find(|p| !matches!(statuses.get(p.as_str()), Some(TaskStatus::Success)));

                let reason = match blocker {
                    Some(p) => Some(format!("predecessor '{}' did not succeed", p)),
                    None if fail_fast && cancelled.load(Ordering::SeqCst) => {
                        Some(CANCELLED.to_string())
                    }
                    None => None,
                };

                match reason {
                    Some(reason) => {
                        tracing::warn!(task = %task.id, %reason, "skipped");
                        log.record(&task.id, LogEvent::Skipped(reason.clone()));
                        statuses.insert(&task.id, TaskStatus::Skipped(reason));
                    }
                    None => runnable.push(task),
                }
            }

            let outcomes: Vec<(&str, TaskStatus, u64)> = pool.install(|| {
                runnable
                    .par_iter()
                    .map(|&task| run_task(task, &log, &cancelled, fail_fast))
                    .collect()
            });

            for (id, status, duration_ms) in outcomes {
                statuses.insert(id, status);
                durations.insert(id, duration_ms);
            }
        }

        let tasks: Vec<TaskOutcome> = plan
            .tasks()
            .iter()
            .map(|task| TaskOutcome {
                id: task.id.clone(),
                module: task.module().map(str::to_string),
                status: statuses
                    .remove(task.id.as_str())
                    .unwrap_or_else(|| TaskStatus::Skipped(CANCELLED.to_string())),
                duration_ms: durations.get(task.id.as_str()).copied().unwrap_or(0),
            })
            .collect();

        let planned: Vec<String> = self
            .states
            .iter()
            .filter(|(_, state)| **state == ModuleState::Planned)
            .map(|(name, _)| name.clone())
            .collect();
        for module in planned {
            let ok = tasks
                .iter()
                .filter(|t| t.module.as_deref() == Some(module.as_str()))
                .all(|t| t.status.is_success());
            let next = if ok {
                ModuleState::Executed
            } else {
                ModuleState::Failed
            };
            self.transition(&module, next)?;
        }

        let result = ExecutionResult {
            fingerprint: plan.fingerprint(),
            tasks,
            modules: self.states.clone(),
            elapsed: start.elapsed(),
            log: log.into_entries(),
        };

        tracing::info!(
            succeeded = result.success_count(),
            failed = result.failure_count(),
            skipped = result.skipped_count(),
            elapsed_ms = result.elapsed.as_millis() as u64,
            "build finished"
        );
        Ok(result)
    }

    fn transition(&mut self, module: &str, next: ModuleState) -> BuildResult<()> {
        let state = self
            .states
            .entry(module.to_string())
            .or_insert(ModuleState::Unevaluated);
        if !state.can_transition(next) {
            return Err(BuildError::InvalidTransition {
                module: module.to_string(),
                from: state.to_string(),
                to: next.to_string(),
            });
        }
        tracing::trace!(module, from = %state, to = %next, "module state");
        *state = next;
        Ok(())
    }

    /// Tasks in declaration order: the implicit `clean`, root tasks, then
    /// each module's tasks
    fn collect_tasks(&self, graph: &ProjectGraph, root: &MergedConfig) -> Vec<Task> {
        let mut tasks = Vec::new();

        if !graph.tasks.iter().any(|t| t.name == CLEAN_TASK) {
            tasks.push(
                Task::new(CLEAN_TASK)
                    .with_description("Delete the build directory")
                    .with_action(DeleteAction::new(&graph.build_dir))
                    .with_context(task_context(graph, None, CLEAN_TASK, root)),
            );
        }

        for spec in &graph.tasks {
            tasks.push(declared_task(graph, None, spec, root));
        }

        for module in &graph.modules {
            if let Some(config) = self.configs.get(&module.name) {
                for spec in &module.tasks {
                    tasks.push(declared_task(graph, Some(module), spec, config));
                }
            }
        }

        tasks
    }
}

fn run_task<'a>(
    task: &'a Task,
    log: &ExecutionLog,
    cancelled: &AtomicBool,
    fail_fast: bool,
) -> (&'a str, TaskStatus, u64) {
    if fail_fast && cancelled.load(Ordering::SeqCst) {
        tracing::warn!(task = %task.id, reason = CANCELLED, "skipped");
        log.record(&task.id, LogEvent::Skipped(CANCELLED.to_string()));
        return (&task.id, TaskStatus::Skipped(CANCELLED.to_string()), 0);
    }

    tracing::info!(task = %task.id, action = %task.action.describe(), "started");
    log.record(&task.id, LogEvent::Started);
    let start = Instant::now();

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run()))
        .unwrap_or_else(|_| Err("task panicked".to_string()));
    let elapsed_ms = start.elapsed().as_millis() as u64;

    let status = match outcome {
        Ok(()) => {
            tracing::info!(task = %task.id, elapsed_ms, "succeeded");
            log.record(&task.id, LogEvent::Succeeded);
            TaskStatus::Success
        }
        Err(reason) => {
            cancelled.store(true, Ordering::SeqCst);
            tracing::warn!(task = %task.id, %reason, elapsed_ms, "failed");
            log.record(&task.id, LogEvent::Failed(reason.clone()));
            TaskStatus::Failed(reason)
        }
    };

    (&task.id, status, elapsed_ms)
}

fn declared_task(
    graph: &ProjectGraph,
    module: Option<&ConfigNode>,
    spec: &TaskSpec,
    config: &MergedConfig,
) -> Task {
    let module_name = module.map(|m| m.name.as_str());
    let id = task_id(module_name, &spec.name);
    let predecessors: Vec<String> = spec
        .depends_on
        .iter()
        .map(|dep| resolve_predecessor(module, dep))
        .collect();

    let mut task = Task::new(id.as_str())
        .with_predecessors(predecessors)
        .with_context(task_context(graph, module_name, &id, config));

    if let Some(command) = &spec.run {
        task = task.with_action(ShellAction::new(command));
    } else if let Some(path) = &spec.delete {
        task = task.with_action(DeleteAction::new(graph.root_dir.join(path)));
    }
    if let Some(description) = &spec.description {
        task = task.with_description(description);
    }
    task
}

/// Bare names resolve to a task of the same module first, then to a
/// project-wide task. Qualified ids are taken as written.
fn resolve_predecessor(module: Option<&ConfigNode>, dep: &str) -> String {
    if dep.contains(':') {
        return dep.to_string();
    }
    match module {
        Some(module) if module.tasks.iter().any(|t| t.name == dep) => {
            task_id(Some(&module.name), dep)
        }
        _ => dep.to_string(),
    }
}

fn task_context(
    graph: &ProjectGraph,
    module: Option<&str>,
    id: &str,
    config: &MergedConfig,
) -> TaskContext {
    let mut env = config.env_vars();
    env.insert("STRATA_PROJECT".to_string(), graph.name.clone());
    env.insert("STRATA_TASK".to_string(), id.to_string());
    env.insert(
        "STRATA_BUILD_DIR".to_string(),
        config.build_dir().display().to_string(),
    );
    if let Some(module) = module {
        env.insert("STRATA_MODULE".to_string(), module.to_string());
    }

    TaskContext {
        task_id: id.to_string(),
        module: module.map(str::to_string),
        working_dir: graph.root_dir.clone(),
        build_dir: config.build_dir().to_path_buf(),
        env,
    }
}
