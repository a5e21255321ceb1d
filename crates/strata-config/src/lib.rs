//! Strata Configuration System
//!
//! Provides the configuration model for multi-module Strata projects:
//! - Per-module declarations (`ConfigNode`)
//! - Hierarchical merging with child-wins overrides (`ConfigMerger`)
//! - Pluggable plugin capability policies
//! - Project manifests (strata.toml) and global user config (~/.strata/config.toml)
//! - Build profiles
//!
//! # Configuration Hierarchy
//!
//! Options are resolved in the following order (later overrides earlier):
//! 1. Global defaults (~/.strata/config.toml)
//! 2. Project defaults (`[defaults]` in strata.toml)
//! 3. Selected profile (`[profiles.<name>]`)
//! 4. Module lineage, root ancestor first
//!
//! # Example
//!
//! ```no_run
//! use strata_config::{ConfigLoader, LoadOptions};
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader
//!     .load_from_directory(Path::new("."), &LoadOptions::default())
//!     .unwrap();
//! println!("{} modules", config.graph.modules.len());
//! ```

pub mod global;
pub mod graph;
pub mod loader;
pub mod merged;
pub mod merger;
pub mod node;
pub mod policy;
pub mod profile;
pub mod project;
pub mod value;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Duplicate module '{0}'")]
    DuplicateModule(String),

    #[error("Plugin conflict in module '{module}': '{first}' and '{second}' {reason}")]
    ConfigConflict {
        module: String,
        first: String,
        second: String,
        reason: String,
    },

    #[error("Unknown profile: {0}")]
    UnknownProfile(String),

    #[error("Home directory not found")]
    HomeNotFound,
}

impl ConfigError {
    /// Create a plugin conflict error
    pub fn conflict(
        module: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConfigConflict {
            module: module.into(),
            first: first.into(),
            second: second.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use graph::ProjectGraph;
pub use loader::{BuildSettings, Config, ConfigLoader, LoadOptions};
pub use merged::MergedConfig;
pub use merger::ConfigMerger;
pub use node::{ConfigNode, Defaults, TaskSpec};
pub use policy::{CapabilityPolicy, ExclusivePolicy, OrderingPolicy, PermissivePolicy, PolicySet};
pub use profile::{ManifestProfileConfig, Profile, ProfileConfig, ProfileManager};
pub use project::ProjectManifest;
pub use value::OptionValue;
