//! Project graph
//!
//! The declarative input of a build: project-wide defaults, plugin policy,
//! root tasks and every module declaration. Build output locations travel
//! through the graph explicitly; nothing here is process-global.

use crate::merged::MergedConfig;
use crate::merger::ConfigMerger;
use crate::node::{ConfigNode, Defaults, TaskSpec};
use crate::policy::{CapabilityPolicy, PolicySet};
use crate::profile::ProfileConfig;
use crate::project::ProjectManifest;
use crate::value::OptionValue;
use crate::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Default build directory name, relative to the project root
pub const DEFAULT_BUILD_DIR: &str = "build";

/// A multi-module project ready for evaluation
#[derive(Debug, Clone)]
pub struct ProjectGraph {
    /// Project name
    pub name: String,
    /// Project root directory
    pub root_dir: PathBuf,
    /// Workspace build directory
    pub build_dir: PathBuf,
    /// Settings every module inherits
    pub defaults: Defaults,
    /// Project-wide tasks
    pub tasks: Vec<TaskSpec>,
    /// Module declarations, in declaration order
    pub modules: Vec<ConfigNode>,
    policy: Arc<dyn CapabilityPolicy>,
}

impl ProjectGraph {
    /// Create an empty project rooted at `root_dir`
    pub fn new(name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            name: name.into(),
            build_dir: root_dir.join(DEFAULT_BUILD_DIR),
            root_dir,
            defaults: Defaults::default(),
            tasks: Vec::new(),
            modules: Vec::new(),
            policy: Arc::new(PolicySet::new()),
        }
    }

    /// Build the graph described by a manifest
    ///
    /// `profile` options are layered over the manifest defaults.
    pub fn from_manifest(
        manifest: &ProjectManifest,
        root_dir: &Path,
        profile: Option<&ProfileConfig>,
    ) -> Self {
        let mut graph = Self::new(manifest.project_name(root_dir), root_dir);
        if let Some(build_dir) = manifest.build_dir() {
            graph.build_dir = root_dir.join(build_dir);
        }

        graph.defaults = manifest.defaults.clone();
        if let Some(profile) = profile {
            for (key, value) in &profile.options {
                graph.defaults.options.insert(key.clone(), value.clone());
            }
        }

        graph.policy = Arc::new(manifest.policy.to_policy());
        graph.tasks = manifest.tasks.clone();
        graph.modules = manifest
            .modules
            .iter()
            .map(|m| m.to_node(root_dir))
            .collect();
        graph
    }

    /// Set the workspace build directory
    pub fn with_build_dir(mut self, build_dir: impl Into<PathBuf>) -> Self {
        self.build_dir = build_dir.into();
        self
    }

    /// Set project defaults
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the plugin capability policy
    pub fn with_policy(mut self, policy: impl CapabilityPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    /// Add a module
    pub fn with_module(mut self, module: ConfigNode) -> Self {
        self.modules.push(module);
        self
    }

    /// Add a project-wide task
    pub fn with_task(mut self, task: TaskSpec) -> Self {
        self.tasks.push(task);
        self
    }

    /// Get a module by name
    pub fn module(&self, name: &str) -> Option<&ConfigNode> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// A merger enforcing this project's plugin policy
    pub fn merger(&self) -> ConfigMerger {
        ConfigMerger::with_policy(Arc::clone(&self.policy))
    }

    /// The configuration parentless modules inherit
    pub fn root_config(&self) -> ConfigResult<MergedConfig> {
        self.merger().root(&self.defaults, self.build_dir.clone())
    }

    /// Check that the workspace build directory can be deleted safely
    ///
    /// `clean` removes the build directory, so it must not be the project
    /// root or one of its ancestors.
    pub fn validate_build_dir(&self) -> ConfigResult<()> {
        let root = normalize(&self.root_dir);
        let build_dir = normalize(&self.build_dir);
        if root.starts_with(&build_dir) {
            return Err(ConfigError::invalid_value(
                "build-dir",
                format!(
                    "'{}' contains the project root '{}'",
                    self.build_dir.display(),
                    self.root_dir.display()
                ),
            ));
        }
        Ok(())
    }

    /// Layer lower-precedence options (e.g. global defaults) under the project defaults
    pub fn with_fallback_options(mut self, options: &BTreeMap<String, OptionValue>) -> Self {
        for (key, value) in options {
            self.defaults
                .options
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
        self
    }
}

/// Resolve `.` and `..` without touching the filesystem
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
