#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Declares that a `bytes` field holds a serialized message of another type,
/// optionally wrapped in the versioned envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    /// Fully-qualified name of the message owning the field.
    #[serde(rename = "type")]
    pub source_type: String,
    /// Declared (proto) name of the bytes field.
    pub field: String,
    /// Fully-qualified name of the message serialized into the field.
    pub target_type: String,
    #[serde(default)]
    pub versioned: bool,
    #[serde(default)]
    pub default_version: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_slice(&data).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Resolve a short alias to a fully-qualified message name.
    /// Unknown names pass through unchanged.
    pub fn resolve_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Return the first declared mapping for `(source_type, field)`, if any.
    pub fn mapping_for(&self, source_type: &str, field: &str) -> Option<&Mapping> {
        self.mappings
            .iter()
            .find(|m| m.source_type == source_type && m.field == field)
    }

    pub fn has_mappings(&self) -> bool {
        !self.mappings.is_empty()
    }
}
