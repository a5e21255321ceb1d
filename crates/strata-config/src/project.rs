//! Project Manifest (strata.toml)
//!
//! Handles the project-level manifest stored in `strata.toml` at the project
//! root: project metadata, defaults for every module, plugin policies,
//! profiles, root tasks and module declarations.

use crate::node::{ConfigNode, Defaults, PluginOptions, TaskSpec};
use crate::policy::{ExclusivePolicy, OrderingPolicy, PolicySet};
use crate::profile::ManifestProfileConfig;
use crate::value::OptionValue;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Manifest file name
pub const MANIFEST_FILE: &str = "strata.toml";

/// Project manifest from strata.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectManifest {
    /// Project metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSection>,

    /// Settings applied to every module
    #[serde(default)]
    pub defaults: Defaults,

    /// Plugin capability rules
    #[serde(default)]
    pub policy: PolicySection,

    /// Build profiles
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, ManifestProfileConfig>,

    /// Project-wide tasks
    #[serde(default, rename = "task")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskSpec>,

    /// Module declarations
    #[serde(default, rename = "module")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<ModuleManifest>,
}

/// Project metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ProjectSection {
    /// Project name
    pub name: String,

    /// Build output directory, relative to the project root (default: "build")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,
}

/// Plugin capability rules
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    /// Pairs of plugins that cannot be applied together
    #[serde(default)]
    pub exclusive: Vec<(String, String)>,

    /// Pairs `[plugin, after]`: `plugin` must be applied after `after`
    #[serde(default)]
    pub order: Vec<(String, String)>,
}

impl PolicySection {
    /// Build the policy set these rules describe
    pub fn to_policy(&self) -> PolicySet {
        let mut set = PolicySet::new();
        if !self.exclusive.is_empty() {
            let exclusive = self
                .exclusive
                .iter()
                .fold(ExclusivePolicy::new(), |p, (a, b)| p.with_pair(a, b));
            set = set.with(exclusive);
        }
        if !self.order.is_empty() {
            let ordering = self
                .order
                .iter()
                .fold(OrderingPolicy::new(), |p, (plugin, after)| p.with_rule(plugin, after));
            set = set.with(ordering);
        }
        set
    }
}

/// A `[[module]]` declaration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct ModuleManifest {
    /// Module name
    pub name: String,

    /// Parent module
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    /// Modules evaluated before this one
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Applied plugins
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,

    /// Explicit build directory, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,

    /// Module options
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,

    /// Plugin-scoped options
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub plugin_options: PluginOptions,

    /// Module tasks
    #[serde(default, rename = "task")]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tasks: Vec<TaskSpec>,
}

impl ModuleManifest {
    /// Convert to a module declaration, resolving paths against `root_dir`
    pub fn to_node(&self, root_dir: &Path) -> ConfigNode {
        let mut plugins: Vec<String> = Vec::with_capacity(self.plugins.len());
        for plugin in &self.plugins {
            if !plugins.contains(plugin) {
                plugins.push(plugin.clone());
            }
        }

        ConfigNode {
            name: self.name.clone(),
            parent: self.parent.clone(),
            options: self.options.clone(),
            plugins,
            plugin_options: self.plugin_options.clone(),
            build_dir: self.build_dir.as_ref().map(|p| root_dir.join(p)),
            dependencies: self.depends_on.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

impl ProjectManifest {
    /// Load the manifest from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let manifest: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    ///
    /// Only checks what can be checked locally. References between modules
    /// and tasks are resolved when the project graph is evaluated.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(project) = &self.project {
            if project.name.is_empty() {
                return Err(ConfigError::invalid_value(
                    "project.name",
                    "name cannot be empty",
                ));
            }
        }

        validate_tasks("task", &self.tasks)?;

        let mut names = HashSet::new();
        for module in &self.modules {
            if module.name.is_empty() {
                return Err(ConfigError::invalid_value(
                    "module.name",
                    "name cannot be empty",
                ));
            }
            if module.name.contains(':') {
                return Err(ConfigError::invalid_value(
                    "module.name",
                    format!("'{}' must not contain ':'", module.name),
                ));
            }
            if !names.insert(module.name.as_str()) {
                return Err(ConfigError::DuplicateModule(module.name.clone()));
            }
            if module.parent.as_deref() == Some(module.name.as_str()) {
                return Err(ConfigError::invalid_value(
                    format!("module.{}.parent", module.name),
                    "a module cannot be its own parent",
                ));
            }
            validate_tasks(&format!("module.{}.task", module.name), &module.tasks)?;
        }

        Ok(())
    }

    /// Project name, falling back to the root directory name
    pub fn project_name(&self, root_dir: &Path) -> String {
        self.project
            .as_ref()
            .map(|p| p.name.clone())
            .or_else(|| {
                root_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
            })
            .unwrap_or_else(|| "project".to_string())
    }

    /// Declared build directory, if any
    pub fn build_dir(&self) -> Option<&Path> {
        self.project.as_ref().and_then(|p| p.build_dir.as_deref())
    }
}

fn validate_tasks(scope: &str, tasks: &[TaskSpec]) -> ConfigResult<()> {
    let mut names = HashSet::new();
    for task in tasks {
        task.validate()?;
        if !names.insert(task.name.as_str()) {
            return Err(ConfigError::invalid_value(
                scope,
                format!("task '{}' is declared more than once", task.name),
            ));
        }
    }
    Ok(())
}

impl std::str::FromStr for ProjectManifest {
    type Err = ConfigError;

    fn from_str(content: &str) -> ConfigResult<Self> {
        let manifest: Self = toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: PathBuf::from(MANIFEST_FILE),
            error: e,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }
}
