//! Built-in task actions
//!
//! Shell commands run through `sh -c` in the task's working directory with
//! the task environment applied, capturing output. Delete actions remove a
//! path recursively and treat a missing path as already clean.

use crate::task::{TaskAction, TaskContext};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;
use walkdir::WalkDir;

/// Run a shell command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellAction {
    command: String,
}

impl ShellAction {
    /// Create a new shell action
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The command line
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl TaskAction for ShellAction {
    fn execute(&self, ctx: &TaskContext) -> Result<(), String> {
        if !ctx.build_dir.as_os_str().is_empty() {
            std::fs::create_dir_all(&ctx.build_dir).map_err(|e| {
                format!(
                    "cannot create build directory {}: {}",
                    ctx.build_dir.display(),
                    e
                )
            })?;
        }

        let start = Instant::now();
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(&self.command)
            .envs(&ctx.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if !ctx.working_dir.as_os_str().is_empty() {
            command.current_dir(&ctx.working_dir);
        }

        let output = command
            .output()
            .map_err(|e| format!("cannot spawn `{}`: {}", self.command, e))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            tracing::debug!(task = %ctx.task_id, "{}", stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            tracing::debug!(task = %ctx.task_id, stream = "stderr", "{}", stderr.trim_end());
        }
        tracing::trace!(
            task = %ctx.task_id,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "command finished"
        );

        if output.status.success() {
            return Ok(());
        }

        let status = match output.status.code() {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        };
        match last_line(&stderr) {
            Some(line) => Err(format!("`{}` failed with {}: {}", self.command, status, line)),
            None => Err(format!("`{}` failed with {}", self.command, status)),
        }
    }

    fn describe(&self) -> String {
        format!("run `{}`", self.command)
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).last()
}

/// Recursively delete a path
///
/// Paths containing the task's working directory (the project root) are
/// never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteAction {
    path: PathBuf,
}

impl DeleteAction {
    /// Create a new delete action
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The path to delete
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskAction for DeleteAction {
    fn execute(&self, ctx: &TaskContext) -> Result<(), String> {
        let path = if self.path.is_absolute() || ctx.working_dir.as_os_str().is_empty() {
            self.path.clone()
        } else {
            ctx.working_dir.join(&self.path)
        };

        let metadata = match std::fs::symlink_metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(task = %ctx.task_id, path = %path.display(), "nothing to delete");
                return Ok(());
            }
            Err(e) => return Err(format!("cannot read {}: {}", path.display(), e)),
        };

        if let (Ok(target), Ok(root)) = (path.canonicalize(), ctx.working_dir.canonicalize()) {
            if root.starts_with(&target) {
                return Err(format!(
                    "refusing to delete {}: it contains the project root",
                    path.display()
                ));
            }
        }

        let removed = if metadata.is_dir() {
            let files = WalkDir::new(&path)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| !entry.file_type().is_dir())
                .count();
            std::fs::remove_dir_all(&path)
                .map_err(|e| format!("cannot delete {}: {}", path.display(), e))?;
            files
        } else {
            std::fs::remove_file(&path)
                .map_err(|e| format!("cannot delete {}: {}", path.display(), e))?;
            1
        };

        tracing::info!(task = %ctx.task_id, path = %path.display(), files = removed, "deleted");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("delete {}", self.path.display())
    }
}

/// Do nothing and succeed
///
/// Used for aggregate tasks that only exist to group their predecessors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoopAction;

impl TaskAction for NoopAction {
    fn execute(&self, _ctx: &TaskContext) -> Result<(), String> {
        Ok(())
    }

    fn describe(&self) -> String {
        "no-op".to_string()
    }
}

/// Run a closure
pub struct FnAction<F> {
    label: String,
    f: F,
}

impl<F> FnAction<F>
where
    F: Fn(&TaskContext) -> Result<(), String> + Send + Sync,
{
    /// Wrap a closure as an action
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnAction<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<F> TaskAction for FnAction<F>
where
    F: Fn(&TaskContext) -> Result<(), String> + Send + Sync,
{
    fn execute(&self, ctx: &TaskContext) -> Result<(), String> {
        (self.f)(ctx)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
