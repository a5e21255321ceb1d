//! Build profile management
//!
//! Profiles (dev, release, custom) are named option sets layered on top of the
//! project defaults before any module configuration is merged.

use crate::value::OptionValue;
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Build profile
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Development profile (default)
    Dev,
    /// Release profile
    Release,
    /// Custom profile
    Custom(String),
}

impl Profile {
    /// Parse profile from string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "dev" => Self::Dev,
            "release" => Self::Release,
            custom => Self::Custom(custom.to_string()),
        }
    }

    /// Get profile name
    pub fn name(&self) -> &str {
        match self {
            Self::Dev => "dev",
            Self::Release => "release",
            Self::Custom(name) => name,
        }
    }

    /// Check if this is a built-in profile
    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Dev | Self::Release)
    }

    /// Get default configuration for this profile
    ///
    /// Every profile starts without options; only the manifest adds them.
    pub fn default_config(&self) -> ProfileConfig {
        ProfileConfig {
            name: self.name().to_string(),
            options: BTreeMap::new(),
        }
    }
}

#[allow(clippy::derivable_impls)]
impl Default for Profile {
    fn default() -> Self {
        Self::Dev
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Resolved profile configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileConfig {
    /// Profile name
    pub name: String,
    /// Options layered over the project defaults
    pub options: BTreeMap<String, OptionValue>,
}

impl ProfileConfig {
    /// Create from profile with defaults
    pub fn from_profile(profile: &Profile) -> Self {
        profile.default_config()
    }

    /// Merge with manifest profile configuration
    pub fn merge_with_manifest(&mut self, manifest: &ManifestProfileConfig) {
        for (key, value) in &manifest.options {
            self.options.insert(key.clone(), value.clone());
        }
    }
}

/// Manifest profile configuration (`[profiles.<name>]` in strata.toml)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestProfileConfig {
    /// Inherit from another profile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits: Option<String>,
    /// Profile options
    #[serde(default)]
    pub options: BTreeMap<String, OptionValue>,
}

/// Profile manager - handles profile loading and configuration
#[derive(Debug, Clone)]
pub struct ProfileManager {
    /// Available profiles
    profiles: HashMap<String, ProfileConfig>,
}

impl ProfileManager {
    /// Create new profile manager
    pub fn new() -> Self {
        let mut profiles = HashMap::new();

        // Register built-in profiles
        profiles.insert("dev".to_string(), Profile::Dev.default_config());
        profiles.insert("release".to_string(), Profile::Release.default_config());

        Self { profiles }
    }

    /// Load profiles from manifest
    ///
    /// Custom profiles may inherit from built-in profiles or from each other.
    pub fn load_from_manifest(
        &mut self,
        manifest_profiles: &BTreeMap<String, ManifestProfileConfig>,
    ) -> ConfigResult<()> {
        let mut resolved = HashMap::new();
        for name in manifest_profiles.keys() {
            let mut visiting = HashSet::new();
            let config = self.resolve(name, manifest_profiles, &mut visiting)?;
            resolved.insert(name.clone(), config);
        }
        self.profiles.extend(resolved);
        Ok(())
    }

    fn resolve(
        &self,
        name: &str,
        manifest_profiles: &BTreeMap<String, ManifestProfileConfig>,
        visiting: &mut HashSet<String>,
    ) -> ConfigResult<ProfileConfig> {
        let Some(manifest) = manifest_profiles.get(name) else {
            return self
                .profiles
                .get(name)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()));
        };

        if !visiting.insert(name.to_string()) {
            return Err(ConfigError::ValidationError(format!(
                "profile '{}' inherits from itself",
                name
            )));
        }

        let profile = Profile::from_str(name);
        let mut config = match &manifest.inherits {
            Some(base) => {
                let mut base = self.resolve(base, manifest_profiles, visiting)?;
                base.name = profile.name().to_string();
                base
            }
            None => profile.default_config(),
        };

        config.merge_with_manifest(manifest);
        visiting.remove(name);
        Ok(config)
    }

    /// Get profile configuration
    pub fn get(&self, profile: &Profile) -> ConfigResult<ProfileConfig> {
        let name = profile.name();
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }

    /// Check if profile exists
    pub fn has_profile(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// List all available profiles
    pub fn list_profiles(&self) -> Vec<String> {
        let mut names: Vec<_> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ProfileManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_from_str() {
        assert_eq!(Profile::from_str("dev"), Profile::Dev);
        assert_eq!(Profile::from_str("RELEASE"), Profile::Release);
        assert_eq!(
            Profile::from_str("staging"),
            Profile::Custom("staging".to_string())
        );
    }

    #[test]
    fn test_profile_is_builtin() {
        assert!(Profile::Dev.is_builtin());
        assert!(Profile::Release.is_builtin());
        assert!(!Profile::Custom("bench".to_string()).is_builtin());
    }

    #[test]
    fn test_builtin_profiles_start_empty() {
        for profile in [Profile::Dev, Profile::Release] {
            let config = profile.default_config();
            assert_eq!(config.name, profile.name());
            assert!(config.options.is_empty());
        }
    }

    #[test]
    fn test_profile_manager_builtin_profiles() {
        let manager = ProfileManager::new();
        assert!(manager.has_profile("dev"));
        assert!(manager.has_profile("release"));
        assert!(!manager.has_profile("staging"));
        assert_eq!(manager.list_profiles(), vec!["dev", "release"]);
    }

    #[test]
    fn test_custom_profile_inherits() {
        let mut manager = ProfileManager::new();
        let mut manifest = BTreeMap::new();
        manifest.insert(
            "staging".to_string(),
            ManifestProfileConfig {
                inherits: Some("release".to_string()),
                options: BTreeMap::from([
                    ("endpoint".to_string(), OptionValue::from("staging")),
                    ("minify".to_string(), OptionValue::from(true)),
                ]),
            },
        );
        manifest.insert(
            "canary".to_string(),
            ManifestProfileConfig {
                inherits: Some("staging".to_string()),
                options: BTreeMap::new(),
            },
        );

        manager.load_from_manifest(&manifest).unwrap();

        let canary = manager.get(&Profile::from_str("canary")).unwrap();
        assert_eq!(canary.name, "canary");
        assert_eq!(canary.options["endpoint"], OptionValue::from("staging"));
        assert_eq!(canary.options["minify"], OptionValue::Bool(true));
        assert_eq!(canary.options.len(), 2);
    }

    #[test]
    fn test_override_builtin_profile() {
        let mut manager = ProfileManager::new();
        let manifest = BTreeMap::from([(
            "release".to_string(),
            ManifestProfileConfig {
                inherits: None,
                options: BTreeMap::from([("minify".to_string(), OptionValue::from(true))]),
            },
        )]);

        manager.load_from_manifest(&manifest).unwrap();
        let release = manager.get(&Profile::Release).unwrap();
        assert_eq!(release.options["minify"], OptionValue::Bool(true));
        assert_eq!(release.options.len(), 1);

        let dev = manager.get(&Profile::Dev).unwrap();
        assert!(dev.options.is_empty());
    }

    #[test]
    fn test_inheritance_cycle_rejected() {
        let mut manager = ProfileManager::new();
        let manifest = BTreeMap::from([
            (
                "a".to_string(),
                ManifestProfileConfig {
                    inherits: Some("b".to_string()),
                    options: BTreeMap::new(),
                },
            ),
            (
                "b".to_string(),
                ManifestProfileConfig {
                    inherits: Some("a".to_string()),
                    options: BTreeMap::new(),
                },
            ),
        ]);

        assert!(matches!(
            manager.load_from_manifest(&manifest),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_unknown_profile() {
        let manager = ProfileManager::new();
        assert!(matches!(
            manager.get(&Profile::from_str("nope")),
            Err(ConfigError::UnknownProfile(_))
        ));
    }
}
