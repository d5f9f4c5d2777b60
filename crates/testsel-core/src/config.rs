//! Run configuration and case catalog files (YAML).
//!
//! Only the parts this crate consumes are modelled: the `testcase` rule list
//! and an optional inline `catalog`. Other top-level keys are ignored.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::case::{CaseDescriptor, DEFAULT_PRIORITY};
use crate::error::{ConfigLoadError, RegistryError};
use crate::registry::CaseRegistry;

/// One case as written in a catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseEntry {
    pub name: String,
    pub suite: String,

    /// Defaults to `"{suite}.{name}"`.
    #[serde(default)]
    pub full_name: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub area: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    DEFAULT_PRIORITY
}

impl From<CaseEntry> for CaseDescriptor {
    fn from(entry: CaseEntry) -> Self {
        let mut case = CaseDescriptor::new(entry.suite, entry.name)
            .with_description(entry.description)
            .with_area(entry.area)
            .with_category(entry.category)
            .with_tags(entry.tags)
            .with_priority(entry.priority);
        if let Some(full_name) = entry.full_name {
            case = case.with_full_name(full_name);
        }
        case
    }
}

/// Build a registry from catalog entries, in order.
pub fn registry_from_entries(entries: Vec<CaseEntry>) -> Result<CaseRegistry, RegistryError> {
    CaseRegistry::from_cases(entries.into_iter().map(CaseDescriptor::from))
}

/// The selection-relevant part of a run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    /// Ordered raw selection rules.
    #[serde(default)]
    pub testcase: Option<Vec<Value>>,

    /// Cases declared inline in the run configuration.
    #[serde(default)]
    pub catalog: Option<Vec<CaseEntry>>,
}

impl RunConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes as unit, not as an empty mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Read and parse a run configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        info!(path = %path.display(), "Loading run configuration");
        let content = read(path)?;
        let config = Self::from_yaml_str(&content).map_err(|source| ConfigLoadError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(
            rules = config.rules().len(),
            inline_cases = config.catalog.as_ref().map_or(0, Vec::len),
            "Parsed run configuration"
        );
        Ok(config)
    }

    /// Selection rules; empty when the `testcase` key is absent.
    pub fn rules(&self) -> &[Value] {
        self.testcase.as_deref().unwrap_or(&[])
    }

    /// Registry built from the inline `catalog`, if one is declared.
    pub fn inline_registry(&self) -> Result<Option<CaseRegistry>, RegistryError> {
        self.catalog
            .clone()
            .map(registry_from_entries)
            .transpose()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    cases: Vec<CaseEntry>,
}

/// Parse a catalog document (`cases: [...]`) into a registry.
pub fn catalog_from_yaml_str(content: &str) -> Result<Vec<CaseEntry>, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str::<CatalogFile>(content).map(|file| file.cases)
}

/// Read a catalog file and register its cases.
pub fn load_catalog(path: &Path) -> Result<CaseRegistry, ConfigLoadError> {
    info!(path = %path.display(), "Loading case catalog");
    let content = read(path)?;
    let entries = catalog_from_yaml_str(&content).map_err(|source| ConfigLoadError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(registry_from_entries(entries)?)
}

fn read(path: &Path) -> Result<String, ConfigLoadError> {
    std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}
