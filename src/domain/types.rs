//! Shared domain types.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// One `display name -> source code` entry of a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub code: String,
}

/// An ordered, read-only name-to-code mapping.
///
/// Iteration order is the order the entries were loaded in, which is also the
/// order the pipeline processes them in. Names are unique; `io::catalog` is
/// responsible for validating them before a `Catalog` is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub(crate) fn from_entries(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn code_of(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.code.as_str())
    }
}

/// One extracted `(Year, Indicator, Value)` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub year: i64,
    pub indicator: String,
    pub value: Option<f64>,
}

/// Tabular file format for written tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

/// What to do with a success response whose body is not valid JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParseFailurePolicy {
    /// Log it and skip the pair, like a failed request.
    Skip,
    /// End the run with an error.
    Abort,
}

/// Remote source settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub base_url: String,
    pub per_page: u32,
    pub timeout: Duration,
    /// Minimum spacing between request starts, shared by all workers.
    pub min_interval: Duration,
}

/// Fully resolved configuration for one `wdi fetch` run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub countries: Catalog,
    pub indicators: Catalog,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub source: SourceConfig,
    pub workers: usize,
    pub on_parse_error: ParseFailurePolicy,
    pub write_manifest: bool,
}

/// File stem for a catalog name: spaces become underscores, nothing else changes.
pub fn file_stem(name: &str) -> String {
    name.replace(' ', "_")
}
