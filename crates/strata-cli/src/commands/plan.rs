//! Plan command - show the execution order without running anything

use crate::report;
use anyhow::Result;
use std::path::PathBuf;
use strata_build::OrchestrationEngine;
use strata_config::LoadOptions;

/// Plan command arguments
#[derive(Debug, Default)]
pub struct PlanArgs {
    pub directory: Option<PathBuf>,
    pub module: Option<String>,
    pub task: Option<String>,
    pub profile: Option<String>,
    pub json: bool,
}

/// Run the plan command
pub fn run(args: PlanArgs) -> Result<u8> {
    let options = LoadOptions {
        profile: args.profile,
        ..Default::default()
    };
    let config = super::load_project(args.directory.as_deref(), &options)?;

    let mut engine = OrchestrationEngine::new(config.settings.clone())
        .with_selection(super::selection(args.module, args.task));
    let plan = engine.plan(&config.graph)?;

    report::print_plan(&plan.summary(), args.json)?;
    Ok(0)
}
