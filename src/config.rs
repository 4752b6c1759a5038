//! YAML configuration for the whole CBIR pipeline.
//!
//! One file carries the descriptor parameters, the store selection, query
//! defaults and the ingestion driver settings. Every section is optional and
//! falls back to its defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "catalogue"
//!
//! descriptor:
//!   image_width: 128
//!   image_height: 128
//!   denoise_sigma: 1.0
//!   bin_count: 16
//!   use_parallel: true
//!
//! store:
//!   backend: redb
//!   path: ./data/images.redb
//!
//! search:
//!   default_top_n: 10
//!   deadline_ms: 5000
//!
//! ingest:
//!   dir: ./images
//!   start_offset: 0
//!   feature_keys: [mean, hist, glcm, hog, gist, dct, wavelet, corners]
//! ```

use std::fs;
use std::path::Path;

use descriptor::{DescriptorConfig, FamilySet};
use index::StoreConfig;
use matcher::MatchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::IngestOptions;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level YAML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CbirConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Preprocessing and extractor parameters
    #[serde(default)]
    pub descriptor: DescriptorConfig,

    /// Document store selection
    #[serde(default)]
    pub store: StoreConfig,

    /// Query defaults and store deadline
    #[serde(default)]
    pub search: MatchConfig,

    /// Batch ingestion settings
    #[serde(default)]
    pub ingest: IngestYamlConfig,
}

impl CbirConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: CbirConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.descriptor
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("descriptor: {e}")))?;
        self.store
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("store: {e}")))?;
        self.search
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("search: {e}")))?;
        self.ingest.validate()?;

        Ok(())
    }
}

impl Default for CbirConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            descriptor: DescriptorConfig::default(),
            store: StoreConfig::default(),
            search: MatchConfig::default(),
            ingest: IngestYamlConfig::default(),
        }
    }
}

/// Ingestion driver YAML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct IngestYamlConfig {
    /// Directory of images to index. The `cbir-ingest` binary also accepts it
    /// as an argument.
    #[serde(default)]
    pub dir: Option<String>,

    /// Number of eligible files (in filename order) to skip before indexing.
    #[serde(default)]
    pub start_offset: usize,

    /// Families to extract; empty means all.
    #[serde(default)]
    pub feature_keys: Vec<String>,
}

impl IngestYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        self.families().map(|_| ())
    }

    pub fn families(&self) -> Result<FamilySet, ConfigLoadError> {
        if self.feature_keys.is_empty() {
            return Ok(FamilySet::all());
        }
        FamilySet::from_keys(&self.feature_keys)
            .map_err(|e| ConfigLoadError::Validation(format!("ingest.feature_keys: {e}")))
    }

    pub fn options(&self) -> Result<IngestOptions, ConfigLoadError> {
        Ok(IngestOptions {
            start_offset: self.start_offset,
            families: self.families()?,
        })
    }
}
