//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::graph::ProjectGraph;
use crate::profile::{Profile, ProfileConfig, ProfileManager};
use crate::project::{ProjectManifest, MANIFEST_FILE};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.strata/config.toml) - lowest priority
/// 2. Project manifest (./strata.toml) - overrides global
/// 3. Environment variables (STRATA_*) - overrides both
/// 4. CLI flags (`LoadOptions`) - highest priority
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Caller-supplied overrides, typically from CLI flags
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Profile to select
    pub profile: Option<String>,
    /// Worker count
    pub jobs: Option<usize>,
    /// Stop starting tasks after the first failure
    pub fail_fast: Option<bool>,
}

/// Execution settings resolved from every configuration source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Number of worker threads
    pub jobs: usize,
    /// Stop starting tasks after the first failure
    pub fail_fast: bool,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            fail_fast: false,
        }
    }
}

/// Loaded configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Project graph ready for evaluation
    pub graph: ProjectGraph,

    /// Selected profile
    pub profile: ProfileConfig,

    /// Execution settings
    pub settings: BuildSettings,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where strata.toml was found)
    pub project_root: PathBuf,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Use an explicit global config path instead of ~/.strata/config.toml
    pub fn with_global_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find strata.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(
        &mut self,
        start_dir: &Path,
        options: &LoadOptions,
    ) -> ConfigResult<Config> {
        let manifest_path = Self::find_manifest(start_dir)
            .ok_or_else(|| ConfigError::NotFound(start_dir.join(MANIFEST_FILE)))?;
        self.load_from_file(&manifest_path, options)
    }

    /// Load configuration from a specific manifest file
    pub fn load_from_file(
        &mut self,
        manifest_path: &Path,
        options: &LoadOptions,
    ) -> ConfigResult<Config> {
        let manifest = ProjectManifest::load_from_file(manifest_path)?;
        let global = self.load_global_config()?;

        let project_root = manifest_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let profile_name = options
            .profile
            .clone()
            .or_else(|| env::var("STRATA_PROFILE").ok())
            .or_else(|| global.profile().map(str::to_string))
            .unwrap_or_else(|| Profile::Dev.name().to_string());

        let mut profiles = ProfileManager::new();
        profiles.load_from_manifest(&manifest.profiles)?;
        let profile = profiles.get(&Profile::from_str(&profile_name))?;

        let mut graph = ProjectGraph::from_manifest(&manifest, &project_root, Some(&profile))
            .with_fallback_options(&global.default_options());

        if let Ok(build_dir) = env::var("STRATA_BUILD_DIR") {
            graph.build_dir = project_root.join(build_dir);
        }
        graph.validate_build_dir()?;

        let settings = self.resolve_settings(&global, options)?;

        tracing::debug!(
            project = %graph.name,
            root = %project_root.display(),
            profile = %profile.name,
            modules = graph.modules.len(),
            jobs = settings.jobs,
            "loaded project configuration"
        );

        Ok(Config {
            graph,
            profile,
            settings,
            global,
            project_root,
        })
    }

    /// Find strata.toml by walking up the directory tree
    pub fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let manifest_path = current.join(MANIFEST_FILE);
            if manifest_path.exists() {
                return Some(manifest_path);
            }

            // Try parent directory
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load global configuration from ~/.strata/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        if self.global_config_path.is_none() {
            match GlobalConfig::global_config_path() {
                Ok(path) => self.global_config_path = Some(path),
                Err(ConfigError::HomeNotFound) => return Ok(GlobalConfig::default()),
                Err(e) => return Err(e),
            }
        }

        match &self.global_config_path {
            // Global config is optional - if it doesn't exist, return default
            Some(path) if path.exists() => GlobalConfig::load_from_file(path),
            _ => Ok(GlobalConfig::default()),
        }
    }

    /// Resolve execution settings: CLI > environment > global > defaults
    ///
    /// Environment variables: STRATA_JOBS, STRATA_FAIL_FAST
    fn resolve_settings(
        &self,
        global: &GlobalConfig,
        options: &LoadOptions,
    ) -> ConfigResult<BuildSettings> {
        let mut settings = BuildSettings::default();

        if let Some(jobs) = global.jobs() {
            settings.jobs = jobs;
        }
        if let Some(fail_fast) = global.fail_fast() {
            settings.fail_fast = fail_fast;
        }

        if let Ok(jobs) = env::var("STRATA_JOBS") {
            settings.jobs = jobs
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    ConfigError::invalid_value("STRATA_JOBS", format!("'{}' is not a positive integer", jobs))
                })?;
        }
        if let Ok(fail_fast) = env::var("STRATA_FAIL_FAST") {
            settings.fail_fast = matches!(fail_fast.to_lowercase().as_str(), "true" | "1" | "yes");
        }

        if let Some(jobs) = options.jobs {
            if jobs == 0 {
                return Err(ConfigError::invalid_value("jobs", "must be at least 1"));
            }
            settings.jobs = jobs;
        }
        if let Some(fail_fast) = options.fail_fast {
            settings.fail_fast = fail_fast;
        }

        Ok(settings)
    }

    /// Get the global configuration directory (~/.strata)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".strata"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Get the project name
    pub fn project_name(&self) -> &str {
        &self.graph.name
    }

    /// Get the project root directory
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }
}
