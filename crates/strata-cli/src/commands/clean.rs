//! Clean command - run the project's `clean` task

use crate::report::{self, Output};
use anyhow::Result;
use std::path::PathBuf;
use strata_build::{OrchestrationEngine, Selection, CLEAN_TASK};
use strata_config::LoadOptions;

/// Run the clean command, returning the process exit code
pub fn run(directory: Option<PathBuf>, output: Output) -> Result<u8> {
    let config = super::load_project(directory.as_deref(), &LoadOptions::default())?;

    let mut engine = OrchestrationEngine::new(config.settings.clone())
        .with_selection(Selection::all().with_task(CLEAN_TASK));
    let result = engine.evaluate(&config.graph)?;

    report::print_result(config.project_name(), &result, output)?;
    let code = result.exit_code();
    // The first failed task becomes the command's error
    result.into_result()?;
    Ok(code)
}
