//! Plugin capability policies
//!
//! Merging itself never decides whether two plugins may coexist. That decision
//! is delegated to a `CapabilityPolicy`, checked against the merged plugin set
//! of every module.

use crate::{ConfigError, ConfigResult};
use std::fmt;

/// Decides whether a module's merged plugin set is acceptable
pub trait CapabilityPolicy: fmt::Debug + Send + Sync {
    /// Check the plugins applied to `module`, in application order
    fn check(&self, module: &str, plugins: &[String]) -> ConfigResult<()>;
}

/// Accepts every plugin combination
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissivePolicy;

impl CapabilityPolicy for PermissivePolicy {
    fn check(&self, _module: &str, _plugins: &[String]) -> ConfigResult<()> {
        Ok(())
    }
}

/// Rejects pairs of plugins that cannot be applied to the same module
#[derive(Debug, Clone, Default)]
pub struct ExclusivePolicy {
    pairs: Vec<(String, String)>,
}

impl ExclusivePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare two plugins mutually exclusive
    pub fn with_pair(mut self, first: impl Into<String>, second: impl Into<String>) -> Self {
        self.pairs.push((first.into(), second.into()));
        self
    }
}

impl CapabilityPolicy for ExclusivePolicy {
    fn check(&self, module: &str, plugins: &[String]) -> ConfigResult<()> {
        for (first, second) in &self.pairs {
            if plugins.contains(first) && plugins.contains(second) {
                return Err(ConfigError::conflict(
                    module,
                    first,
                    second,
                    "are mutually exclusive",
                ));
            }
        }
        Ok(())
    }
}

/// Requires some plugins to be applied after others
///
/// A rule `(plugin, after)` only constrains modules that apply both.
#[derive(Debug, Clone, Default)]
pub struct OrderingPolicy {
    rules: Vec<(String, String)>,
}

impl OrderingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `plugin` to be applied after `after`
    pub fn with_rule(mut self, plugin: impl Into<String>, after: impl Into<String>) -> Self {
        self.rules.push((plugin.into(), after.into()));
        self
    }
}

impl CapabilityPolicy for OrderingPolicy {
    fn check(&self, module: &str, plugins: &[String]) -> ConfigResult<()> {
        for (plugin, after) in &self.rules {
            let plugin_pos = plugins.iter().position(|p| p == plugin);
            let after_pos = plugins.iter().position(|p| p == after);
            if let (Some(p), Some(a)) = (plugin_pos, after_pos) {
                if p < a {
                    return Err(ConfigError::conflict(
                        module,
                        plugin,
                        after,
                        "are applied out of order: the first must be applied after the second",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Several policies checked in declaration order
#[derive(Debug, Default)]
pub struct PolicySet {
    policies: Vec<Box<dyn CapabilityPolicy>>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a policy
    pub fn with(mut self, policy: impl CapabilityPolicy + 'static) -> Self {
        self.policies.push(Box::new(policy));
        self
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl CapabilityPolicy for PolicySet {
    fn check(&self, module: &str, plugins: &[String]) -> ConfigResult<()> {
        for policy in &self.policies {
            policy.check(module, plugins)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugins(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_permissive_accepts_anything() {
        let policy = PermissivePolicy;
        assert!(policy.check("app", &plugins(&["a", "b"])).is_ok());
    }

    #[test]
    fn test_exclusive_pair() {
        let policy = ExclusivePolicy::new().with_pair("android.application", "android.library");

        assert!(policy
            .check("app", &plugins(&["android.application", "kotlin"]))
            .is_ok());

        let err = policy
            .check("app", &plugins(&["android.library", "android.application"]))
            .unwrap_err();
        match err {
            ConfigError::ConfigConflict {
                module,
                first,
                second,
                ..
            } => {
                assert_eq!(module, "app");
                assert_eq!(first, "android.application");
                assert_eq!(second, "android.library");
            }
            other => panic!("Expected ConfigConflict, got {:?}", other),
        }
    }

    #[test]
    fn test_ordering_rule() {
        let policy = OrderingPolicy::new().with_rule("flutter", "android.application");

        assert!(policy
            .check("app", &plugins(&["android.application", "flutter"]))
            .is_ok());
        assert!(policy.check("app", &plugins(&["flutter"])).is_ok());
        assert!(policy
            .check("app", &plugins(&["flutter", "android.application"]))
            .is_err());
    }

    #[test]
    fn test_policy_set_checks_all() {
        let set = PolicySet::new()
            .with(PermissivePolicy)
            .with(ExclusivePolicy::new().with_pair("a", "b"));

        assert_eq!(set.len(), 2);
        assert!(set.check("m", &plugins(&["a"])).is_ok());
        assert!(set.check("m", &plugins(&["a", "b"])).is_err());
    }
}
