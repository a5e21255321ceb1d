//! CLI configuration via environment variables
//!
//! Output preferences come from the environment so scripts and CI can set
//! them once. Build settings (jobs, profile, fail-fast) are resolved by the
//! configuration loader instead.

use std::env;

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Default to JSON output (STRATA_OUTPUT=json)
    pub default_json: bool,
    /// Disable colored output (STRATA_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            default_json: env::var("STRATA_OUTPUT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            no_color: env::var("STRATA_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear() {
        env::remove_var("STRATA_OUTPUT");
        env::remove_var("STRATA_NO_COLOR");
        env::remove_var("NO_COLOR");
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear();
        let config = Config::from_env();
        assert!(!config.default_json);
        assert!(!config.no_color);
    }

    #[test]
    #[serial]
    fn test_json_output_from_env() {
        clear();
        env::set_var("STRATA_OUTPUT", "JSON");
        assert!(Config::from_env().default_json);

        env::set_var("STRATA_OUTPUT", "text");
        assert!(!Config::from_env().default_json);
        clear();
    }

    #[test]
    #[serial]
    fn test_no_color_from_env() {
        clear();
        env::set_var("NO_COLOR", "1");
        assert!(Config::from_env().no_color);
        clear();
    }
}
