//! Configuration document schema and loading
//!
//! The document is keyed by the PascalCase names of the external schema
//! and may be written as JSON or YAML:
//!
//! ```yaml
//! Identification: varinfo_config
//! Version: 1
//! CollectionShortNamePath:
//!   - /HDF5_GLOBAL/short_name
//! Mission:
//!   ATL\d{2}: ICESat2
//! RequiredVariables:
//!   - Applicability: { Mission: GEDI }
//!     VariablePattern: [".*shot_number"]
//! MetadataOverrides:
//!   - Applicability: { Mission: ICESat2, VariablePattern: "/gt1l/.*" }
//!     Attributes:
//!       - { Name: coordinates, Value: "lat lon" }
//! ```

use crate::graph::AttributeValue;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    Missing(PathBuf),

    #[error("Unsupported configuration format (expected .json, .yml or .yaml): {0}")]
    UnsupportedFormat(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("{section}[{index}] has no applicability predicate")]
    EmptyApplicability { section: &'static str, index: usize },

    #[error("MetadataOverrides[{index}] has an invalid attribute: {reason}")]
    InvalidAttribute { index: usize, reason: String },

    #[error("Unsupported configuration version: {0}")]
    UnsupportedVersion(String),
}

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration versions this crate understands
const SUPPORTED_MAJOR_VERSION: u64 = 1;

/// Raw configuration document, before validation and pattern compilation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConfigDocument {
    #[serde(default)]
    pub identification: Option<String>,

    #[serde(default)]
    pub version: Option<DocumentVersion>,

    /// Attribute paths searched, in order, for the collection short name
    #[serde(default)]
    pub collection_short_name_path: Vec<String>,

    /// Short-name pattern to mission name, first match wins
    #[serde(default)]
    pub mission: IndexMap<String, String>,

    #[serde(default)]
    pub excluded_science_variables: Vec<PatternEntry>,

    #[serde(default)]
    pub required_variables: Vec<PatternEntry>,

    #[serde(default)]
    pub metadata_overrides: Vec<OverrideEntry>,
}

/// `Version` may be written as a number or a dotted string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DocumentVersion {
    Number(u64),
    Text(String),
}

impl DocumentVersion {
    fn major(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(text) => text.split('.').next()?.trim().parse().ok(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(text) => text.clone(),
        }
    }
}

/// The `Applicability` block shared by every rule section
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ApplicabilityEntry {
    #[serde(rename = "Mission", default)]
    pub mission: Option<String>,

    #[serde(rename = "ShortNamePath", default)]
    pub short_name_path: Option<String>,

    #[serde(rename = "VariablePattern", default)]
    pub variable_pattern: Option<String>,
}

impl ApplicabilityEntry {
    fn has_granule_predicate(&self) -> bool {
        self.mission.is_some() || self.short_name_path.is_some()
    }
}

/// An `ExcludedScienceVariables` or `RequiredVariables` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PatternEntry {
    pub applicability: ApplicabilityEntry,
    #[serde(default)]
    pub variable_pattern: Vec<String>,
}

/// A `MetadataOverrides` entry
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OverrideEntry {
    pub applicability: ApplicabilityEntry,
    #[serde(default)]
    pub attributes: Vec<AttributeEntry>,
}

/// One `{ Name, Value }` pair of an override
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<AttributeValue>,
}

impl ConfigDocument {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read a document from disk, choosing the parser by file extension
    pub fn from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("json") => Self::from_json_str(&std::fs::read_to_string(path)?),
            Some("yml") | Some("yaml") => Self::from_yaml_str(&std::fs::read_to_string(path)?),
            _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Structural checks that do not need compiled patterns
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(version) = &self.version {
            if version.major() != Some(SUPPORTED_MAJOR_VERSION) {
                return Err(ConfigError::UnsupportedVersion(version.describe()));
            }
        }

        for (index, entry) in self.excluded_science_variables.iter().enumerate() {
            if !entry.applicability.has_granule_predicate() {
                return Err(ConfigError::EmptyApplicability {
                    section: "ExcludedScienceVariables",
                    index,
                });
            }
        }

        for (index, entry) in self.required_variables.iter().enumerate() {
            if !entry.applicability.has_granule_predicate() {
                return Err(ConfigError::EmptyApplicability {
                    section: "RequiredVariables",
                    index,
                });
            }
        }

        for (index, entry) in self.metadata_overrides.iter().enumerate() {
            let applicability = &entry.applicability;
            if !applicability.has_granule_predicate() && applicability.variable_pattern.is_none()
            {
                return Err(ConfigError::EmptyApplicability {
                    section: "MetadataOverrides",
                    index,
                });
            }

            for attribute in &entry.attributes {
                match (&attribute.name, &attribute.value) {
                    (Some(name), Some(_)) if !name.is_empty() => {}
                    (Some(name), None) => {
                        return Err(ConfigError::InvalidAttribute {
                            index,
                            reason: format!("attribute '{}' has no Value", name),
                        });
                    }
                    _ => {
                        return Err(ConfigError::InvalidAttribute {
                            index,
                            reason: "attribute has no Name".to_string(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
