//! Configuration file handling

use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result};
use serde::Deserialize;
use sqlmend_core::RemapTable;

/// Configuration for sqlmend, loaded from `sqlmend.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Schema DDL file paths
    #[serde(default)]
    pub schema: Vec<String>,

    /// Flat JSON schema export path
    #[serde(default)]
    pub schema_json: Option<String>,

    /// Document file patterns
    #[serde(default)]
    pub files: Vec<String>,

    /// Fuzzy match threshold
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Semantic remaps: `[remaps.<table>] <column> = { rename = "..." }`
    /// or `{ expression = "..." }` with a `{q}` qualifier placeholder
    #[serde(default)]
    pub remaps: RemapTable,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).into_diagnostic()?;
        let config: Config = toml::from_str(&contents).into_diagnostic()?;
        Ok(config)
    }

    /// Try to find and load sqlmend.toml in the current directory or any
    /// parent directory.
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join("sqlmend.toml");
            if config_path.exists() {
                return Ok(Some(Self::from_file(&config_path)?));
            }

            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Merge CLI arguments into configuration.
    /// CLI arguments take precedence over config file values.
    pub fn merge_with_args(
        mut self,
        schema: &[PathBuf],
        schema_json: &Option<PathBuf>,
        files: &[PathBuf],
        threshold: Option<f64>,
    ) -> Self {
        if !schema.is_empty() {
            self.schema = schema.iter().map(|p| p.display().to_string()).collect();
        }

        if schema_json.is_some() {
            self.schema_json = schema_json.as_ref().map(|p| p.display().to_string());
        }

        if !files.is_empty() {
            self.files = files.iter().map(|p| p.display().to_string()).collect();
        }

        if threshold.is_some() {
            self.threshold = threshold;
        }

        self
    }

    /// The effective remap table: the built-in legacy Customers set with
    /// configured remaps layered on top.
    pub fn effective_remaps(&self) -> RemapTable {
        let mut remaps = RemapTable::customers_legacy();
        remaps.merge(self.remaps.clone());
        remaps
    }
}
