//! Module declarations
//!
//! A `ConfigNode` is what a single module declares before inheritance is
//! applied. Nodes are built once when the project graph is constructed and are
//! never mutated by merging.

use crate::merged::MergedConfig;
use crate::value::OptionValue;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Options applied only where a plugin is applied, keyed by plugin id
pub type PluginOptions = BTreeMap<String, BTreeMap<String, OptionValue>>;

/// One module's declared build configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigNode {
    /// Module name
    pub name: String,
    /// Parent module, if any
    pub parent: Option<String>,
    /// Declared options
    pub options: BTreeMap<String, OptionValue>,
    /// Applied plugins, in application order
    pub plugins: Vec<String>,
    /// Plugin-scoped options
    pub plugin_options: PluginOptions,
    /// Explicit build directory (derived from the parent when absent)
    pub build_dir: Option<PathBuf>,
    /// Modules that must be evaluated before this one
    pub dependencies: Vec<String>,
    /// Declared tasks
    pub tasks: Vec<TaskSpec>,
}

impl ConfigNode {
    /// Create a new, empty module declaration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the parent module
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Declare an option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Apply a plugin
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        let plugin = plugin.into();
        if !self.plugins.contains(&plugin) {
            self.plugins.push(plugin);
        }
        self
    }

    /// Declare an option that applies where `plugin` is applied
    pub fn with_plugin_option(
        mut self,
        plugin: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<OptionValue>,
    ) -> Self {
        self.plugin_options
            .entry(plugin.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    /// Set an explicit build directory
    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = Some(build_dir.into());
        self
    }

    /// Set module dependencies
    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Declare a task
    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    /// Modules this one must be evaluated after (parent first)
    pub fn evaluation_dependencies(&self) -> Vec<String> {
        let mut deps = Vec::with_capacity(self.dependencies.len() + 1);
        if let Some(parent) = &self.parent {
            deps.push(parent.clone());
        }
        for dep in &self.dependencies {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        deps
    }
}

impl From<&MergedConfig> for ConfigNode {
    /// Turn an effective configuration back into a declaration.
    ///
    /// Dependency edges and tasks are module-scoped and are not part of a
    /// merged configuration, so the resulting node declares none.
    fn from(merged: &MergedConfig) -> Self {
        let parent = merged
            .lineage
            .len()
            .checked_sub(2)
            .map(|i| merged.lineage[i].clone());

        Self {
            name: merged.module.clone(),
            parent,
            options: merged.options.clone(),
            plugins: merged.plugins.clone(),
            plugin_options: merged.plugin_options.clone(),
            build_dir: Some(merged.build_dir.clone()),
            dependencies: Vec::new(),
            tasks: Vec::new(),
        }
    }
}

/// Settings every module inherits (the `[defaults]` table)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Defaults {
    /// Options applied to every module
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,

    /// Plugins applied to every module
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Options applied to every module that applies the keyed plugin
    #[serde(default)]
    pub plugin_options: PluginOptions,
}

/// A declared task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct TaskSpec {
    /// Task name (unqualified)
    pub name: String,

    /// Human readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Predecessor tasks (bare names resolve within the same module first)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Shell command to run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<String>,

    /// Path to delete, relative to the project root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<PathBuf>,
}

impl TaskSpec {
    /// Create a task with no action
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            depends_on: Vec::new(),
            run: None,
            delete: None,
        }
    }

    /// Set predecessor tasks
    pub fn with_depends_on(mut self, depends_on: Vec<String>) -> Self {
        self.depends_on = depends_on;
        self
    }

    /// Run a shell command
    pub fn with_run(mut self, command: impl Into<String>) -> Self {
        self.run = Some(command.into());
        self
    }

    /// Delete a path
    pub fn with_delete(mut self, path: impl Into<PathBuf>) -> Self {
        self.delete = Some(path.into());
        self
    }

    /// Validate the declaration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.is_empty() {
            return Err(ConfigError::invalid_value("task.name", "name cannot be empty"));
        }
        if self.name.contains(':') {
            return Err(ConfigError::invalid_value(
                "task.name",
                format!("'{}' must not contain ':'", self.name),
            ));
        }
        if self.run.is_some() && self.delete.is_some() {
            return Err(ConfigError::invalid_value(
                format!("task.{}", self.name),
                "a task may declare either `run` or `delete`, not both",
            ));
        }
        Ok(())
    }
}
