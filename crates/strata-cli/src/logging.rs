//! Log output setup
//!
//! Library crates log through `tracing`; the binary decides what is shown.
//! `-v`/`-q` win over `STRATA_LOG`, which wins over the default of `warn`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "STRATA_LOG";

/// Install the global subscriber, writing to stderr
pub fn init(verbose: u8, quiet: bool) {
    let filter = match explicit_level(verbose, quiet) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    // A subscriber may already be installed (e.g. under test harnesses)
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}

fn explicit_level(verbose: u8, quiet: bool) -> Option<&'static str> {
    match (quiet, verbose) {
        (true, _) => Some("error"),
        (false, 0) => None,
        (false, 1) => Some("debug"),
        (false, _) => Some("trace"),
    }
}
