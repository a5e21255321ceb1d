//! Build command - plan and run the selected tasks

use crate::report::{self, Output};
use anyhow::Result;
use std::path::PathBuf;
use strata_build::OrchestrationEngine;
use strata_config::LoadOptions;

/// Build command arguments
#[derive(Debug, Default)]
pub struct BuildArgs {
    /// Project directory (defaults to current directory)
    pub directory: Option<PathBuf>,
    /// Only tasks owned by this module
    pub module: Option<String>,
    /// Only tasks with this name or id
    pub task: Option<String>,
    /// Build profile
    pub profile: Option<String>,
    /// Number of worker threads
    pub jobs: Option<usize>,
    /// Stop starting tasks after the first failure
    pub fail_fast: bool,
    /// Output mode
    pub output: Output,
}

/// Run the build command, returning the process exit code
pub fn run(args: BuildArgs) -> Result<u8> {
    let options = LoadOptions {
        profile: args.profile,
        jobs: args.jobs,
        // Only an explicit flag overrides the configured setting
        fail_fast: args.fail_fast.then_some(true),
    };
    let config = super::load_project(args.directory.as_deref(), &options)?;

    tracing::info!(
        project = %config.project_name(),
        profile = %config.profile.name,
        jobs = config.settings.jobs,
        "building"
    );

    let mut engine = OrchestrationEngine::new(config.settings.clone())
        .with_selection(super::selection(args.module, args.task));
    let result = engine.evaluate(&config.graph)?;

    report::print_result(config.project_name(), &result, args.output)?;
    let code = result.exit_code();
    // The first failed task becomes the command's error
    result.into_result()?;
    Ok(code)
}
