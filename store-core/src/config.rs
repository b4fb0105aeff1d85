//! Store-wide settings read by the tax rule resolver and the admin forms.
//!
//! Settings are loaded from a TOML file; every key is optional.
//!
//! ```toml
//! int_len = 9
//! tax_rule_priority = ["product_id", "product_class_id", "pref_id", "country_id"]
//! option_product_tax_rule = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::rules::ScopeKey;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Unknown tax rule priority key '{0}'")]
    UnknownPriorityKey(String),

    #[error("Tax rule priority key '{0}' is listed more than once")]
    DuplicatePriorityKey(String),

    #[error("int_len must be greater than zero")]
    InvalidIntLen,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum number of characters accepted by numeric form fields.
    pub int_len: usize,

    /// Scope keys in ascending precedence; later entries win. Keys may carry
    /// an `_id` suffix (`pref_id`, `product_class_id`).
    pub tax_rule_priority: Vec<String>,

    /// Per-product tax rules. When off, product and product class are
    /// ignored during resolution.
    pub option_product_tax_rule: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            int_len: 9,
            tax_rule_priority: vec![
                "product_id".to_string(),
                "product_class_id".to_string(),
                "pref_id".to_string(),
                "country_id".to_string(),
            ],
            option_product_tax_rule: false,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.int_len == 0 {
            return Err(ConfigError::InvalidIntLen);
        }
        self.priority_keys().map(|_| ())
    }

    /// The configured priority list parsed into scope keys, lowest
    /// precedence first. Each scope may appear once, so the list holds at
    /// most four keys.
    pub fn priority_keys(&self) -> Result<Vec<ScopeKey>, ConfigError> {
        let mut keys = Vec::with_capacity(self.tax_rule_priority.len());
        for raw in &self.tax_rule_priority {
            let key =
                ScopeKey::parse(raw).ok_or_else(|| ConfigError::UnknownPriorityKey(raw.clone()))?;
            if keys.contains(&key) {
                return Err(ConfigError::DuplicatePriorityKey(raw.clone()));
            }
            keys.push(key);
        }
        Ok(keys)
    }
}
