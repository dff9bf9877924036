//! Engine configuration loaded from TOML.

use crate::predicate::{PlaceholderStyle, SqlDialect};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fold constant sub-expressions before evaluation or rendering
    pub fold_constants: bool,
    /// Reject paths an entity model does not declare
    pub strict_paths: bool,
    pub placeholder_style: PlaceholderStyle,
    /// Maximum number of distinct compiled filters kept by a subscription set
    pub compile_cache_capacity: usize,
    /// SQL rendering overrides, function name to function name or `{N}` pattern
    pub sql_functions: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fold_constants: true,
            strict_paths: true,
            placeholder_style: PlaceholderStyle::Question,
            compile_cache_capacity: 1024,
            sql_functions: BTreeMap::new(),
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// SQL dialect with this configuration's overrides and placeholder style
    pub fn sql_dialect(&self) -> SqlDialect {
        SqlDialect::with_overrides(&self.sql_functions).placeholder_style(self.placeholder_style)
    }
}
