//! Command implementations

pub mod build;
pub mod clean;
pub mod plan;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use strata_build::Selection;
use strata_config::{Config, ConfigLoader, LoadOptions};

/// Load the project containing `directory` (default: the current directory)
pub fn load_project(directory: Option<&Path>, options: &LoadOptions) -> Result<Config> {
    let start = match directory {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to read the current directory")?,
    };
    let start = absolute(&start)?;

    ConfigLoader::new()
        .load_from_directory(&start, options)
        .with_context(|| format!("Failed to load project from {}", start.display()))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()
        .context("Failed to read the current directory")?
        .join(path))
}

/// Selection from `--module` / `--task`
pub fn selection(module: Option<String>, task: Option<String>) -> Selection {
    let mut selection = Selection::all();
    if let Some(module) = module {
        selection = selection.with_module(module);
    }
    if let Some(task) = task {
        selection = selection.with_task(task);
    }
    selection
}
