//! Configuration merging
//!
//! Combines a module's declaration with the effective configuration of its
//! parent. Rules:
//! - child options override parent options with the same key
//! - plugin sets are unioned, keeping first-application order
//! - dependency edges and tasks are module-scoped and never inherited
//! - plugin-scoped options are inherited and take effect where the plugin is
//!   first applied, or where the module itself declares them for an applied
//!   plugin; they never override options the module declares directly
//! - the build directory is explicit or derived as `<parent build dir>/<name>`

use crate::merged::MergedConfig;
use crate::node::{ConfigNode, Defaults, PluginOptions};
use crate::policy::{CapabilityPolicy, PermissivePolicy};
use crate::value::OptionValue;
use crate::ConfigResult;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Module name reported for conflicts in the `[defaults]` table
const DEFAULTS_SCOPE: &str = "<defaults>";

/// Merges module declarations onto inherited configuration
#[derive(Debug, Clone)]
pub struct ConfigMerger {
    policy: Arc<dyn CapabilityPolicy>,
}

impl ConfigMerger {
    /// Create a merger that accepts every plugin combination
    pub fn new() -> Self {
        Self {
            policy: Arc::new(PermissivePolicy),
        }
    }

    /// Create a merger that checks plugin sets against `policy`
    pub fn with_policy(policy: Arc<dyn CapabilityPolicy>) -> Self {
        Self { policy }
    }

    /// Build the configuration that parentless modules inherit
    pub fn root(&self, defaults: &Defaults, build_dir: impl Into<PathBuf>) -> ConfigResult<MergedConfig> {
        let mut config = MergedConfig::root(build_dir);
        config.options = defaults.options.clone();
        config.plugin_options = defaults.plugin_options.clone();

        for plugin in &defaults.plugins {
            if !config.plugins.contains(plugin) {
                config.plugins.push(plugin.clone());
            }
        }

        apply_plugin_options(
            &mut config.options,
            &defaults.options,
            &config.plugins,
            &config.plugin_options,
        );

        self.policy.check(DEFAULTS_SCOPE, &config.plugins)?;
        Ok(config)
    }

    /// Merge a child declaration onto its parent's effective configuration
    pub fn merge(&self, parent: &MergedConfig, child: &ConfigNode) -> ConfigResult<MergedConfig> {
        let mut options = parent.options.clone();
        for (key, value) in &child.options {
            options.insert(key.clone(), value.clone());
        }

        let mut plugin_options = parent.plugin_options.clone();
        for (plugin, scoped) in &child.plugin_options {
            let entry = plugin_options.entry(plugin.clone()).or_default();
            for (key, value) in scoped {
                entry.insert(key.clone(), value.clone());
            }
        }

        let mut plugins = parent.plugins.clone();
        let mut newly_applied = Vec::new();
        for plugin in &child.plugins {
            if !plugins.contains(plugin) {
                plugins.push(plugin.clone());
                newly_applied.push(plugin.clone());
            }
        }

        // Plugins first applied here see every inherited scoped option
        apply_plugin_options(&mut options, &child.options, &newly_applied, &plugin_options);

        // Plugins applied by an ancestor only see what this module adds
        let inherited: Vec<String> = plugins
            .iter()
            .filter(|p| !newly_applied.contains(p))
            .cloned()
            .collect();
        apply_plugin_options(&mut options, &child.options, &inherited, &child.plugin_options);

        self.policy.check(&child.name, &plugins)?;

        let mut lineage = parent.lineage.clone();
        // Re-merging a module onto its own configuration keeps the lineage
        if lineage.last() != Some(&child.name) {
            lineage.push(child.name.clone());
        }

        let build_dir = child
            .build_dir
            .clone()
            .unwrap_or_else(|| parent.build_dir.join(&child.name));

        tracing::debug!(
            module = %child.name,
            options = options.len(),
            plugins = plugins.len(),
            build_dir = %build_dir.display(),
            "merged module configuration"
        );

        Ok(MergedConfig {
            module: child.name.clone(),
            lineage,
            options,
            plugins,
            plugin_options,
            build_dir,
        })
    }

    /// Merge a chain of declarations, root ancestor first
    pub fn merge_chain(&self, root: &MergedConfig, chain: &[&ConfigNode]) -> ConfigResult<MergedConfig> {
        let mut current = root.clone();
        for node in chain {
            current = self.merge(&current, node)?;
        }
        Ok(current)
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Fill options from the scoped tables of `plugins`, skipping keys in `declared`
fn apply_plugin_options(
    options: &mut BTreeMap<String, OptionValue>,
    declared: &BTreeMap<String, OptionValue>,
    plugins: &[String],
    scoped: &PluginOptions,
) {
    for plugin in plugins {
        let Some(table) = scoped.get(plugin) else {
            continue;
        };
        for (key, value) in table {
            if !declared.contains_key(key) {
                options.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ExclusivePolicy;
    use crate::ConfigError;
    use std::path::Path;

    fn root() -> MergedConfig {
        MergedConfig::root("build")
    }

    #[test]
    fn test_child_overrides_parent() {
        let merger = ConfigMerger::new();
        let a = merger.merge(&root(), &ConfigNode::new("a").with_option("x", 1)).unwrap();
        let b = merger
            .merge(&a, &ConfigNode::new("b").with_parent("a").with_option("x", 2))
            .unwrap();

        assert_eq!(a.get("x"), Some(&OptionValue::Integer(1)));
        assert_eq!(b.get("x"), Some(&OptionValue::Integer(2)));
        assert_eq!(b.lineage, vec!["a", "b"]);
    }

    #[test]
    fn test_plugins_union_in_order() {
        let merger = ConfigMerger::new();
        let a = merger
            .merge(&root(), &ConfigNode::new("a").with_plugin("java").with_plugin("kotlin"))
            .unwrap();
        let b = merger
            .merge(&a, &ConfigNode::new("b").with_plugin("kotlin").with_plugin("flutter"))
            .unwrap();

        assert_eq!(b.plugins, vec!["java", "kotlin", "flutter"]);
    }

    #[test]
    fn test_build_dir_derived_from_parent() {
        let merger = ConfigMerger::new();
        let a = merger.merge(&root(), &ConfigNode::new("a")).unwrap();
        let b = merger.merge(&a, &ConfigNode::new("b")).unwrap();
        let c = merger
            .merge(&b, &ConfigNode::new("c").with_build_dir("out/c"))
            .unwrap();

        assert_eq!(a.build_dir(), Path::new("build/a"));
        assert_eq!(b.build_dir(), Path::new("build/a/b"));
        assert_eq!(c.build_dir(), Path::new("out/c"));
    }

    #[test]
    fn test_plugin_options_apply_where_plugin_first_applied() {
        let merger = ConfigMerger::new();
        let defaults = Defaults {
            plugin_options: BTreeMap::from([(
                "java".to_string(),
                BTreeMap::from([("toolchain".to_string(), OptionValue::from(17))]),
            )]),
            ..Default::default()
        };
        let base = merger.root(&defaults, "build").unwrap();

        let plain = merger.merge(&base, &ConfigNode::new("plain")).unwrap();
        assert!(plain.get("toolchain").is_none());

        let app = merger
            .merge(&base, &ConfigNode::new("app").with_plugin("java"))
            .unwrap();
        assert_eq!(app.get("toolchain"), Some(&OptionValue::Integer(17)));

        let pinned = merger
            .merge(
                &base,
                &ConfigNode::new("legacy").with_plugin("java").with_option("toolchain", 11),
            )
            .unwrap();
        assert_eq!(pinned.get("toolchain"), Some(&OptionValue::Integer(11)));

        // Descendants inherit the pinned value rather than re-applying the plugin table
        let child = merger.merge(&pinned, &ConfigNode::new("child")).unwrap();
        assert_eq!(child.get("toolchain"), Some(&OptionValue::Integer(11)));
    }

    #[test]
    fn test_policy_conflict_fails_merge() {
        let policy = ExclusivePolicy::new().with_pair("application", "library");
        let merger = ConfigMerger::with_policy(Arc::new(policy));

        let a = merger
            .merge(&root(), &ConfigNode::new("a").with_plugin("application"))
            .unwrap();
        let result = merger.merge(&a, &ConfigNode::new("b").with_plugin("library"));

        match result {
            Err(ConfigError::ConfigConflict { module, .. }) => assert_eq!(module, "b"),
            other => panic!("Expected ConfigConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_is_idempotent() {
        let merger = ConfigMerger::new();
        let a = merger
            .merge(&root(), &ConfigNode::new("a").with_option("x", 1).with_plugin("java"))
            .unwrap();
        let b = merger
            .merge(&a, &ConfigNode::new("b").with_option("y", "two"))
            .unwrap();

        let again = merger.merge(&b, &ConfigNode::from(&b)).unwrap();
        assert_eq!(again, b);
    }

    #[test]
    fn test_dependencies_not_inherited() {
        let merger = ConfigMerger::new();
        let a = merger
            .merge(
                &root(),
                &ConfigNode::new("a").with_dependencies(vec!["core".to_string()]),
            )
            .unwrap();
        let node = ConfigNode::from(&a);
        assert!(node.dependencies.is_empty());
    }
}
