use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use strata_build::BuildError;
use strata_config::ConfigError;

mod commands;
mod config;
mod logging;
mod report;

/// Strata multi-module build orchestrator.
///
/// Strata reads a project manifest (strata.toml), resolves each module's
/// configuration through its parent chain, plans the declared tasks in
/// dependency order and runs them in parallel.
///
/// EXAMPLES:
///     strata build                      Build every module
///     strata build --module=app         Build one module
///     strata build --task=test          Run one task across modules
///     strata plan --json                Show the execution plan
///     strata clean                      Delete the build directory
///
/// ENVIRONMENT VARIABLES:
///     STRATA_LOG         Log filter (e.g. 'debug', 'strata_build=trace')
///     STRATA_OUTPUT      Set to 'json' for JSON output by default
///     STRATA_PROFILE     Default build profile
///     STRATA_JOBS        Number of worker threads
///     STRATA_FAIL_FAST   Stop starting tasks after the first failure
///     STRATA_BUILD_DIR   Build directory, relative to the project root
///     NO_COLOR           Set to disable colored output
#[derive(Parser)]
#[command(name = "strata")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Run as if started in <DIR>
    #[arg(short = 'C', long = "directory", value_name = "DIR", global = true)]
    directory: Option<PathBuf>,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the project
    ///
    /// Runs every task except `clean`, or only the selected ones together
    /// with everything they depend on. A failed task skips its dependents;
    /// independent tasks keep running.
    ///
    /// EXAMPLES:
    ///     strata build                       Build everything
    ///     strata build --module=app          Only tasks of module 'app'
    ///     strata build --task=compile        Every task named 'compile'
    ///     strata build --task=app:assemble   One task by id
    ///     strata build --profile=release     Build with the release profile
    #[command(visible_alias = "b")]
    Build {
        /// Only run tasks owned by this module
        #[arg(long, short = 'm')]
        module: Option<String>,
        /// Only run tasks with this name or id
        #[arg(long, short = 't')]
        task: Option<String>,
        /// Build profile (dev, release, or custom)
        #[arg(long, short = 'p')]
        profile: Option<String>,
        /// Number of worker threads
        #[arg(long, short = 'j')]
        jobs: Option<usize>,
        /// Stop starting new tasks after the first failure
        #[arg(long)]
        fail_fast: bool,
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Delete build output
    ///
    /// Runs the project's `clean` task. Unless the manifest declares its own,
    /// `clean` deletes the workspace build directory.
    Clean {
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Show the execution plan without running it
    ///
    /// EXAMPLES:
    ///     strata plan                   Plan a full build
    ///     strata plan --module=app      Plan one module
    ///     strata plan --json            Machine-readable plan
    Plan {
        /// Only plan tasks owned by this module
        #[arg(long, short = 'm')]
        module: Option<String>,
        /// Only plan tasks with this name or id
        #[arg(long, short = 't')]
        task: Option<String>,
        /// Build profile (dev, release, or custom)
        #[arg(long, short = 'p')]
        profile: Option<String>,
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    ///
    /// Outputs shell completion scripts for bash, zsh, fish, or powershell.
    /// Redirect to a file and source it in your shell configuration.
    ///
    /// EXAMPLES:
    ///     strata completions bash > ~/.bash_completions/strata.bash
    ///     strata completions zsh > ~/.zfunc/_strata
    ///     strata completions fish > ~/.config/fish/completions/strata.fish
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cli_config = config::Config::from_env();

    logging::init(cli.verbose, cli.quiet);
    if cli_config.no_color {
        colored::control::set_override(false);
    }

    match run(cli, &cli_config) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: Cli, cli_config: &config::Config) -> Result<u8> {
    let output = report::Output {
        json: false,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Build {
            module,
            task,
            profile,
            jobs,
            fail_fast,
            json,
        } => {
            // Command-line flag overrides environment variable
            let args = commands::build::BuildArgs {
                directory: cli.directory,
                module,
                task,
                profile,
                jobs,
                fail_fast,
                output: report::Output {
                    json: json || cli_config.default_json,
                    ..output
                },
            };
            commands::build::run(args)
        }
        Commands::Clean { json } => commands::clean::run(
            cli.directory,
            report::Output {
                json: json || cli_config.default_json,
                ..output
            },
        ),
        Commands::Plan {
            module,
            task,
            profile,
            json,
        } => {
            let args = commands::plan::PlanArgs {
                directory: cli.directory,
                module,
                task,
                profile,
                json: json || cli_config.default_json,
            };
            commands::plan::run(args)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(0)
        }
    }
}

/// `2` for configuration and graph errors, `1` for everything else
fn exit_code(err: &anyhow::Error) -> u8 {
    for cause in err.chain() {
        if let Some(build) = cause.downcast_ref::<BuildError>() {
            return build.exit_code();
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 2;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_build::GraphKind;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_selection_flags() {
        let cli = Cli::parse_from(["strata", "build", "--module=app", "--task=compile"]);
        match cli.command {
            Commands::Build { module, task, .. } => {
                assert_eq!(module.as_deref(), Some("app"));
                assert_eq!(task.as_deref(), Some("compile"));
            }
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["strata", "build", "-C", "android", "-vv"]);
        assert_eq!(cli.directory, Some(PathBuf::from("android")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["strata", "-q", "-v", "build"]).is_err());
    }

    #[test]
    fn test_alias_b_for_build() {
        let cli = Cli::parse_from(["strata", "b", "--jobs", "3"]);
        assert!(matches!(cli.command, Commands::Build { jobs: Some(3), .. }));
    }

    #[test]
    fn test_completions_bash() {
        let cli = Cli::parse_from(["strata", "completions", "bash"]);
        match cli.command {
            Commands::Completions { shell } => assert_eq!(shell, Shell::Bash),
            _ => panic!("Expected Completions command"),
        }
    }

    #[test]
    fn test_exit_code_mapping() {
        let cycle = anyhow::Error::from(BuildError::cycle(GraphKind::Task, vec!["a".into()]));
        assert_eq!(exit_code(&cycle), 2);

        let missing = anyhow::Error::from(ConfigError::NotFound(PathBuf::from("strata.toml")))
            .context("Failed to load project");
        assert_eq!(exit_code(&missing), 2);

        let failure = anyhow::Error::from(BuildError::task_failed("build", "exit code 1"));
        assert_eq!(exit_code(&failure), 1);

        assert_eq!(exit_code(&anyhow::anyhow!("something else")), 1);
    }
}
