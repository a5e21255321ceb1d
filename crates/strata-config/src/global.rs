//! Global Configuration (~/.strata/config.toml)
//!
//! Handles user-level configuration stored in `~/.strata/config.toml`.

use crate::value::OptionValue;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.strata/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Build execution settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<GlobalBuildConfig>,

    /// Lowest-precedence option defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<GlobalDefaultsConfig>,
}

/// Build execution settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct GlobalBuildConfig {
    /// Number of worker threads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,

    /// Stop starting new tasks after the first failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fail_fast: Option<bool>,

    /// Default profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

/// Option defaults applied to every project
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalDefaultsConfig {
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(build) = &self.build {
            if build.jobs == Some(0) {
                return Err(ConfigError::invalid_value(
                    "build.jobs",
                    "must be at least 1",
                ));
            }
        }
        Ok(())
    }

    /// Get the path of the global configuration file
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".strata").join("config.toml"))
    }

    /// Configured worker count
    pub fn jobs(&self) -> Option<usize> {
        self.build.as_ref().and_then(|b| b.jobs)
    }

    /// Configured fail-fast setting
    pub fn fail_fast(&self) -> Option<bool> {
        self.build.as_ref().and_then(|b| b.fail_fast)
    }

    /// Configured default profile
    pub fn profile(&self) -> Option<&str> {
        self.build.as_ref().and_then(|b| b.profile.as_deref())
    }

    /// Option defaults (empty when not configured)
    pub fn default_options(&self) -> BTreeMap<String, OptionValue> {
        self.defaults
            .as_ref()
            .map(|d| d.options.clone())
            .unwrap_or_default()
    }
}
