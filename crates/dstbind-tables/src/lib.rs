//! dstbind Tables
//!
//! Hand-maintained facts about the DST2k header set that cannot be read
//! from the headers themselves:
//!
//! - **implied includes**: baseline headers every project header uses
//!   without including them
//! - **correction rules**: "header X needs header Y" where X never says so
//! - **invalid registries**: headers to skip entirely, functions and
//!   extern variables with no linkable definition
//! - **link libraries** handed on to the binding generator
//!
//! The tables are data, not code. A default set ships with the crate
//! (`data/builtin.yaml`); a YAML or JSON file can replace it.
//!
//! ```text
//! ontime2_dst.h ──(scanned)──> ...
//!       └──(corrected)──> hsum_dst.h
//! ```

use dstbind_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

const BUILTIN_TABLES: &str = include_str!("../data/builtin.yaml");

/// A missing-include correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRule {
    /// Headers that need `requires` without including it
    pub triggers: Vec<String>,
    /// Header to add to the dependency set
    pub requires: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl CorrectionRule {
    pub fn new(triggers: &[&str], requires: &str) -> Self {
        Self {
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            requires: requires.to_string(),
            note: None,
        }
    }

    /// Whether the header or any of its dependencies triggers this rule
    pub fn applies_to(&self, header: &str, dependencies: &[String]) -> bool {
        self.triggers
            .iter()
            .any(|t| t == header || dependencies.iter().any(|d| d == t))
    }
}

/// Registry entry with the reason it is excluded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl InvalidEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            reason: None,
        }
    }
}

/// Static configuration tables for a header set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderTables {
    /// Headers every project header implicitly includes
    #[serde(default)]
    pub implied_includes: Vec<String>,
    /// Baseline type-definition header, placed first among non-bank headers
    #[serde(default)]
    pub standard_types_header: String,
    /// Missing-include corrections, applied in order
    #[serde(default)]
    pub corrections: Vec<CorrectionRule>,
    /// Headers skipped by every stage
    #[serde(default)]
    pub invalid_headers: Vec<InvalidEntry>,
    /// Functions dropped from the output
    #[serde(default)]
    pub invalid_functions: Vec<InvalidEntry>,
    /// Extern variables dropped from the output
    #[serde(default)]
    pub broken_externs: Vec<InvalidEntry>,
    /// Typedefs the binding generator already provides
    #[serde(default)]
    pub native_types: Vec<String>,
    /// Libraries to link against
    #[serde(default)]
    pub libraries: Vec<String>,
}

impl HeaderTables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables shipped with dstbind for the DST2k header set
    pub fn builtin() -> Result<Self> {
        Self::from_yaml_str(BUILTIN_TABLES)
    }

    /// Parse tables from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Self::parse_yaml(content, "tables")
    }

    fn parse_yaml(content: &str, origin: &str) -> Result<Self> {
        let tables: HeaderTables = serde_yaml::from_str(content)
            .map_err(|e| Error::Config(format!("{}: invalid tables: {}", origin, e)))?;
        tables.validate()?;
        Ok(tables)
    }

    /// Load tables from a YAML file
    pub fn load_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        debug!("Loading tables from {:?}", path);
        Self::parse_yaml(&content, &path.display().to_string())
    }

    /// Load tables from a JSON file
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let tables: HeaderTables = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: invalid tables: {}", path.display(), e)))?;
        tables.validate()?;
        Ok(tables)
    }

    /// Load tables, picking the format from the file extension
    pub fn load(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::load_json(path),
            _ => Self::load_yaml(path),
        }
    }

    /// Reject tables the resolver cannot work with
    pub fn validate(&self) -> Result<()> {
        for (i, rule) in self.corrections.iter().enumerate() {
            if rule.requires.is_empty() {
                return Err(Error::Config(format!("correction rule {} has no required header", i)));
            }
            if rule.triggers.is_empty() {
                return Err(Error::Config(format!(
                    "correction rule for {} has no triggers",
                    rule.requires
                )));
            }
            if rule.triggers.contains(&rule.requires) {
                return Err(Error::Config(format!(
                    "correction rule for {} lists itself as a trigger",
                    rule.requires
                )));
            }
        }

        let registries = [
            ("invalid_headers", &self.invalid_headers),
            ("invalid_functions", &self.invalid_functions),
            ("broken_externs", &self.broken_externs),
        ];
        for (table, entries) in registries {
            if entries.iter().any(|e| e.name.is_empty()) {
                return Err(Error::Config(format!("{} contains an empty name", table)));
            }
        }

        if self.implied_includes.iter().any(|h| self.is_invalid_header(h)) {
            return Err(Error::Config("an implied include is listed as invalid".into()));
        }

        Ok(())
    }

    pub fn is_invalid_header(&self, name: &str) -> bool {
        self.invalid_headers.iter().any(|e| e.name == name)
    }

    pub fn is_invalid_function(&self, name: &str) -> bool {
        self.invalid_functions.iter().any(|e| e.name == name)
    }

    pub fn is_broken_extern(&self, name: &str) -> bool {
        self.broken_externs.iter().any(|e| e.name == name)
    }

    pub fn is_native_type(&self, name: &str) -> bool {
        self.native_types.iter().any(|t| t == name)
    }

    /// Names of all invalid headers
    pub fn invalid_header_names(&self) -> HashSet<String> {
        self.invalid_headers.iter().map(|e| e.name.clone()).collect()
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Other(e.to_string()))
    }
}
