//! Effective module configuration

use crate::node::PluginOptions;
use crate::value::OptionValue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A module's configuration after combining it with its ancestor chain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedConfig {
    /// Module name (empty for the project-wide root configuration)
    pub module: String,
    /// Module names from the root ancestor down to this module
    pub lineage: Vec<String>,
    /// Effective options
    pub options: BTreeMap<String, OptionValue>,
    /// Applied plugins, in first-application order
    pub plugins: Vec<String>,
    /// Inherited plugin-scoped options
    pub plugin_options: PluginOptions,
    /// Build output directory
    pub build_dir: PathBuf,
}

impl MergedConfig {
    /// An empty root configuration writing to `build_dir`
    pub fn root(build_dir: impl Into<PathBuf>) -> Self {
        Self {
            module: String::new(),
            lineage: Vec::new(),
            options: BTreeMap::new(),
            plugins: Vec::new(),
            plugin_options: BTreeMap::new(),
            build_dir: build_dir.into(),
        }
    }

    /// Whether this is the project-wide root configuration
    pub fn is_root(&self) -> bool {
        self.lineage.is_empty()
    }

    /// Look up an effective option
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.options.get(key)
    }

    /// Look up a string option
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(OptionValue::as_str)
    }

    /// Build output directory
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Options as environment variables (`STRATA_OPT_<KEY>`)
    ///
    /// Keys are upper-cased and every character outside `[A-Z0-9]` becomes `_`.
    /// When several keys map to the same variable, the key that sorts first
    /// wins and the others are dropped with a warning.
    pub fn env_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        let mut sources: BTreeMap<String, &str> = BTreeMap::new();

        for (key, value) in &self.options {
            let name = format!("STRATA_OPT_{}", env_key(key));
            if let Some(first) = sources.get(&name) {
                tracing::warn!(
                    module = %self.module,
                    variable = %name,
                    kept = %first,
                    dropped = %key,
                    "option keys collide in the task environment"
                );
                continue;
            }
            sources.insert(name.clone(), key);
            vars.insert(name, value.to_string());
        }
        vars
    }
}

fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_config() {
        let root = MergedConfig::root("build");
        assert!(root.is_root());
        assert_eq!(root.build_dir(), Path::new("build"));
        assert!(root.get("anything").is_none());
    }

    #[test]
    fn test_env_vars() {
        let mut config = MergedConfig::root("build");
        config
            .options
            .insert("kotlin.jvm-target".to_string(), OptionValue::from("17"));
        config.options.insert("minSdk".to_string(), OptionValue::from(21));

        let env = config.env_vars();
        assert_eq!(env["STRATA_OPT_KOTLIN_JVM_TARGET"], "17");
        assert_eq!(env["STRATA_OPT_MINSDK"], "21");
    }

    #[test]
    fn test_env_vars_collision_keeps_first_key() {
        let mut config = MergedConfig::root("build");
        config.options.insert("a-b".to_string(), OptionValue::from("dash"));
        config.options.insert("a.b".to_string(), OptionValue::from("dot"));
        config.options.insert("a_b".to_string(), OptionValue::from("underscore"));

        let env = config.env_vars();
        assert_eq!(env.len(), 1);
        assert_eq!(env["STRATA_OPT_A_B"], "dash");
    }
}
