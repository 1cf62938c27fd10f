//! Configuration system for pubsearch.
//!
//! All components take their dependencies explicitly: a [`Config`] (or the
//! relevant slice of it) is passed in at construction time, and there is no
//! process-global client or default index name. Configuration is read from a
//! TOML file; every field has a default so a missing file or a partial file
//! is fine.

#![warn(missing_docs)]

mod error;

use std::{fs, path::Path};

use serde::Deserialize;

pub use error::ConfigError;

/// Default names of the per-table keywords that are indexed and faceted.
const DEFAULT_DATA_KEYWORDS: &[&str] = &["cmenergies", "observables", "phrases", "reactions"];

/// Default resource types rendered as analysis badges on publications.
const DEFAULT_ANALYSIS_TYPES: &[&str] =
    &["rivet", "MadAnalysis", "SModelS", "CheckMATE", "HackAnalysis"];

/// Fully resolved configuration for the search subsystem.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the search backend.
    pub backend_url: String,
    /// Name of the main publication/table index.
    pub index: String,
    /// Name of the author index (maintained elsewhere, exposed for callers).
    pub author_index: String,
    /// Public site URL used to build download and resource links.
    pub site_url: String,
    /// Request timeout for backend calls, in seconds.
    pub timeout_secs: u64,
    /// Number of submissions per reindexing batch.
    pub batch_size: usize,
    /// Child-query window as a multiple of the requested page size.
    ///
    /// Caps how many table documents one search can pull in for pathological
    /// publications with very many tables.
    pub child_window_factor: usize,
    /// Bounded retries for the keyword push-down partial update.
    pub update_retries: u32,
    /// Keyword names copied from tables into `data_keywords`.
    pub data_keywords: Vec<String>,
    /// Resource types recognised as analyses (e.g. `rivet`).
    pub analysis_types: Vec<String>,
    /// Resource type rendered as a landing page rather than a raw URL.
    pub histfactory_type: String,
    /// Whether to request a cmenergies facet aggregation.
    ///
    /// Off by default: older backend versions reject range aggregations over
    /// the `{gte, lte}` objects cmenergies values are stored as.
    pub cmenergies_facet: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:9200".to_string(),
            index: "publications".to_string(),
            author_index: "authors".to_string(),
            site_url: "http://localhost:5000".to_string(),
            timeout_secs: 30,
            batch_size: 50,
            child_window_factor: 50,
            update_retries: 3,
            data_keywords: DEFAULT_DATA_KEYWORDS.iter().map(ToString::to_string).collect(),
            analysis_types: DEFAULT_ANALYSIS_TYPES.iter().map(ToString::to_string).collect(),
            histfactory_type: "histfactory".to_string(),
            cmenergies_facet: false,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// Missing keys fall back to their defaults; unknown keys are an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Whether a keyword name is in the configured data-keyword set.
    pub fn is_data_keyword(&self, name: &str) -> bool {
        self.data_keywords.iter().any(|k| k == name)
    }
}
