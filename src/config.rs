//! YAML configuration for registries.
//!
//! Supports a registry-wide start identifier, fixture ordering and
//! per-type builder settings.
//!
//! ```yaml
//! start_id: 150
//! all_fixtures_order: [Author, Article]
//! builders:
//!   Article:
//!     start_id: 250
//!     generated_field_order: [author, title]
//!     defaults:
//!       is_visible: false
//! ```

use crate::builder::BuilderDecl;
use crate::error::Result;
use crate::field::FieldMap;
use crate::value::Value;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn default_start_id() -> i64 {
    1
}

/// Per-type builder settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Start identifier for this type (overrides the registry's)
    pub start_id: Option<i64>,
    /// Fields evaluated first, in this order
    pub generated_field_order: Vec<String>,
    /// Literal default values (JSON primitives only)
    pub defaults: BTreeMap<String, serde_json::Value>,
}

impl BuilderConfig {
    /// Turn the settings into a declaration for `type_name`.
    pub fn to_decl(&self, type_name: &str) -> Result<BuilderDecl> {
        let mut defaults = FieldMap::new();
        for (field, json) in &self.defaults {
            defaults.insert(field.as_str(), Value::from_json(field, json)?);
        }
        let mut decl = BuilderDecl::new(type_name)
            .defaults(defaults)
            .generated_field_order(self.generated_field_order.iter().cloned());
        decl.start_id = self.start_id;
        Ok(decl)
    }
}

/// Complete YAML configuration for a registry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// First identifier handed out by builders without their own start id
    pub start_id: i64,
    /// Type order of breakdowns
    pub all_fixtures_order: Vec<String>,
    /// Derive the breakdown order from foreign keys instead
    pub dependency_order: bool,
    /// Per-type builder settings
    pub builders: BTreeMap<String, BuilderConfig>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            start_id: default_start_id(),
            all_fixtures_order: Vec::new(),
            dependency_order: false,
            builders: BTreeMap::new(),
        }
    }
}

impl RegistryConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: RegistryConfig = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// Get settings for a specific type
    pub fn get_builder_config(&self, type_name: &str) -> Option<&BuilderConfig> {
        self.builders.get(type_name)
    }

    /// Builder declarations for every configured type, in name order
    pub fn builder_decls(&self) -> Result<Vec<BuilderDecl>> {
        self.builders
            .iter()
            .map(|(type_name, config)| config.to_decl(type_name))
            .collect()
    }
}
