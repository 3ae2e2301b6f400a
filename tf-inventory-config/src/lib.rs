//! Shared configuration loader for tf-inventory.
//!
//! `defaults/tf-inventory.default.toml` is embedded into the binary so the documented
//! defaults and runtime behavior stay in sync. Callers layer user files, environment
//! variables and explicit overrides on top via [`Loader`] before deserializing into
//! [`InventoryConfig`], which converts into the core pipeline types.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tf_inventory::{
    AddressRule, HierarchyRules, ManifestParser, Pipeline, TreeWalker, WalkOptions,
};

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../defaults/tf-inventory.default.toml");

/// Prefix of environment variables read by [`Loader::with_env`].
pub const ENV_PREFIX: &str = "TF_INVENTORY";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryConfig {
    pub discovery: DiscoveryConfig,
    pub addressing: AddressingConfig,
    #[serde(default)]
    pub hierarchy: Vec<ParentRuleConfig>,
}

/// One `[[hierarchy]]` table. Group names live in values so their case survives
/// loading.
#[derive(Debug, Clone, Deserialize)]
pub struct ParentRuleConfig {
    pub parent: String,
    #[serde(default)]
    pub children: Vec<String>,
}

/// Where manifests live and what they are called.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    pub root: PathBuf,
    pub manifest_name: String,
    pub follow_links: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressingConfig {
    pub prefix: String,
}

impl InventoryConfig {
    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            manifest_name: self.discovery.manifest_name.clone(),
            follow_links: self.discovery.follow_links,
        }
    }

    pub fn address_rule(&self) -> AddressRule {
        AddressRule::new(self.addressing.prefix.clone())
    }

    /// Later tables for the same parent replace earlier ones.
    pub fn hierarchy_rules(&self) -> HierarchyRules {
        let mut rules = HierarchyRules::new();
        for rule in &self.hierarchy {
            rules.insert(rule.parent.as_str(), rule.children.iter().map(String::as_str));
        }
        rules
    }

    pub fn pipeline(&self) -> Pipeline {
        let parser = ManifestParser::new(self.address_rule());
        let walker = TreeWalker::new(parser, self.walk_options());
        Pipeline::new(walker, self.hierarchy_rules())
    }

    /// The manifest root; relative roots are joined onto `base`.
    pub fn resolve_root(&self, base: &Path) -> PathBuf {
        if self.discovery.root.is_absolute() {
            self.discovery.root.clone()
        } else {
            base.join(&self.discovery.root)
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer `TF_INVENTORY__<SECTION>__<KEY>` environment variables.
    pub fn with_env(mut self) -> Self {
        let source = Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__");
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override; it wins over every other layer.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<InventoryConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<InventoryConfig, ConfigError> {
    Loader::new().build()
}
