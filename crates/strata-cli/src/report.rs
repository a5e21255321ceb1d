//! Human-readable and JSON output for build results and plans

use colored::*;
use serde_json::json;
use strata_build::{ExecutionResult, PlanSummary, TaskStatus};

/// How results are printed
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    /// Print JSON to stdout
    pub json: bool,
    /// Suppress everything but errors
    pub quiet: bool,
}

/// Print a finished run
pub fn print_result(project: &str, result: &ExecutionResult, output: Output) -> anyhow::Result<()> {
    if output.json {
        let mut value = serde_json::to_value(result)?;
        value["project"] = json!(project);
        value["exit_code"] = json!(result.exit_code());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    // Failures go to stderr even in quiet mode
    for task in &result.tasks {
        match &task.status {
            TaskStatus::Success if !output.quiet => {
                println!(
                    "{:>8} {} {}",
                    "OK".green().bold(),
                    task.id,
                    format!("({}ms)", task.duration_ms).dimmed()
                );
            }
            TaskStatus::Success => {}
            TaskStatus::Failed(reason) => {
                eprintln!("{:>8} {}: {}", "FAILED".red().bold(), task.id, reason);
            }
            TaskStatus::Skipped(reason) if !output.quiet => {
                println!("{:>8} {}: {}", "SKIPPED".yellow().bold(), task.id, reason);
            }
            TaskStatus::Skipped(_) => {}
        }
    }

    if output.quiet {
        return Ok(());
    }

    let secs = result.elapsed.as_secs_f64();
    if result.succeeded() {
        println!(
            "\n{} {} in {:.2}s ({} tasks)",
            "Build".bold(),
            "succeeded".green().bold(),
            secs,
            result.tasks.len()
        );
    } else {
        println!(
            "\n{} {} in {:.2}s: {} succeeded, {} failed, {} skipped",
            "Build".bold(),
            "failed".red().bold(),
            secs,
            result.success_count(),
            result.failure_count(),
            result.skipped_count()
        );
    }
    Ok(())
}

/// Print a plan
pub fn print_plan(summary: &PlanSummary, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    for (i, level) in summary.levels.iter().enumerate() {
        println!("{}", format!("Level {}", i + 1).bold());
        for id in level {
            let action = summary
                .tasks
                .iter()
                .find(|t| &t.id == id)
                .map(|t| t.action.as_str())
                .unwrap_or_default();
            println!("  {} {}", id, action.dimmed());
        }
    }
    println!("\n{} {}", "Fingerprint:".bold(), summary.fingerprint);
    Ok(())
}
