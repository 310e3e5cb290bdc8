//! Store configuration
//!
//! Everything a store needs that can be written down as JSON. A callable
//! default cannot, and goes through [`StoreBuilder`](super::StoreBuilder).

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;
use crate::index::{AttributePolicy, POSITION_ATTRIBUTE};
use crate::observability::Event;

/// Shape of query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnMode {
    /// Exactly one match, otherwise `AmbiguousMatch`
    #[default]
    Single,
    /// Always a list, possibly empty
    List,
    /// The record when exactly one matches, otherwise a list
    Auto,
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Allow-list for attributes arriving on records (default: any)
    #[serde(default)]
    pub allowed_attributes: Option<Vec<String>>,

    /// Attributes that are never tracked (default: none)
    #[serde(default)]
    pub excluded_attributes: Vec<String>,

    /// Result shape of `query` (default: single)
    #[serde(default)]
    pub return_mode: ReturnMode,

    /// Whether update/remove may touch more than one record (default: false)
    #[serde(default)]
    pub allow_multiple_edit: bool,

    /// Reject records carrying forbidden attributes (default: true)
    #[serde(default = "default_strict_admission")]
    pub strict_admission: bool,

    /// Store-wide default for missing attributes (default: null)
    #[serde(default)]
    pub default_value: Value,
}

fn default_strict_admission() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            allowed_attributes: None,
            excluded_attributes: Vec::new(),
            return_mode: ReturnMode::default(),
            allow_multiple_edit: false,
            strict_admission: default_strict_admission(),
            default_value: Value::Null,
        }
    }
}

impl StoreConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        debug!(
            target: "attrdb::store",
            event = %Event::ConfigLoaded,
            path = %path.display(),
        );
        Ok(config)
    }

    /// Rejects names no store may track
    pub fn validate(&self) -> Result<(), ConfigError> {
        let allowed = self.allowed_attributes.iter().flatten();
        if let Some(name) = allowed
            .chain(&self.excluded_attributes)
            .find(|name| name.as_str() == POSITION_ATTRIBUTE)
        {
            return Err(ConfigError::Invalid(format!(
                "'{name}' is reserved and cannot be configured"
            )));
        }
        if let Some(allowed) = &self.allowed_attributes {
            if let Some(name) = allowed.iter().find(|name| self.excluded_attributes.contains(name)) {
                return Err(ConfigError::Invalid(format!(
                    "'{name}' is both allowed and excluded"
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn policy(&self) -> AttributePolicy {
        AttributePolicy::new(
            self.allowed_attributes.clone(),
            self.excluded_attributes.clone(),
        )
    }
}
