//! Configuration management and validation.
//!
//! Provides the configuration for a preparation batch: where raw snapshots
//! are read from, where artifacts go, which sources run and how artifacts
//! are encoded. Defaults can be overridden from a JSON file and then by
//! command-line arguments.

use crate::constants::{DEFAULT_PREPARED_DIR, DEFAULT_RAW_DIR, MAX_DEFAULT_WORKERS};
use crate::error::{PrepError, Result};
use crate::models::Source;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// On-disk encoding of lookup artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactFormat {
    /// Column-major nested map: column name -> code -> value
    #[default]
    Json,
    /// One row per code with `code`, `lat`, `lon` and passthrough columns
    Parquet,
}

impl ArtifactFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactFormat::Json => "json",
            ArtifactFormat::Parquet => "parquet",
        }
    }

    /// Full artifact path for a source under `prepared_dir`
    pub fn artifact_path(&self, prepared_dir: &Path, source: Source) -> PathBuf {
        prepared_dir.join(format!("{}.{}", source.artifact_name(), self.extension()))
    }
}

impl fmt::Display for ArtifactFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArtifactFormat {
    type Err = PrepError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(ArtifactFormat::Json),
            "parquet" => Ok(ArtifactFormat::Parquet),
            other => Err(PrepError::Configuration {
                message: format!("Unknown artifact format '{}' (expected json or parquet)", other),
            }),
        }
    }
}

/// Configuration for a preparation batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Directory holding the raw reference snapshots
    pub raw_dir: PathBuf,

    /// Directory receiving the lookup artifacts
    pub prepared_dir: PathBuf,

    /// Sources to prepare
    pub sources: Vec<Source>,

    /// Artifact encoding
    pub format: ArtifactFormat,

    /// Carry raw columns other than the key and coordinates into each record
    pub passthrough: bool,

    /// Maximum number of sources prepared at the same time
    pub workers: usize,

    /// Show a progress bar while sources run
    pub show_progress: bool,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from(DEFAULT_RAW_DIR),
            prepared_dir: PathBuf::from(DEFAULT_PREPARED_DIR),
            sources: Source::ALL.to_vec(),
            format: ArtifactFormat::default(),
            passthrough: true,
            workers: num_cpus::get().clamp(1, MAX_DEFAULT_WORKERS),
            show_progress: true,
        }
    }
}

impl PrepConfig {
    /// Load a configuration file; absent fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PrepError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let config: PrepConfig = serde_json::from_str(&contents)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn with_raw_dir(mut self, raw_dir: impl Into<PathBuf>) -> Self {
        self.raw_dir = raw_dir.into();
        self
    }

    pub fn with_prepared_dir(mut self, prepared_dir: impl Into<PathBuf>) -> Self {
        self.prepared_dir = prepared_dir.into();
        self
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_format(mut self, format: ArtifactFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Keep only `lat`/`lon` in each record
    pub fn without_passthrough(mut self) -> Self {
        self.passthrough = false;
        self
    }

    pub fn without_progress(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// Selected sources, deduplicated, in canonical order
    pub fn selected_sources(&self) -> Vec<Source> {
        let mut sources = self.sources.clone();
        sources.sort();
        sources.dedup();
        sources
    }

    /// Raw snapshot path of a source
    pub fn raw_path(&self, source: Source) -> PathBuf {
        self.raw_dir.join(source.raw_file_name())
    }

    /// Artifact path of a source
    pub fn artifact_path(&self, source: Source) -> PathBuf {
        self.format.artifact_path(&self.prepared_dir, source)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(PrepError::Configuration {
                message: "workers must be at least 1".to_string(),
            });
        }
        if self.sources.is_empty() {
            return Err(PrepError::Configuration {
                message: "no sources selected".to_string(),
            });
        }
        if self.raw_dir == self.prepared_dir {
            return Err(PrepError::Configuration {
                message: format!(
                    "raw and prepared directories must differ: {}",
                    self.raw_dir.display()
                ),
            });
        }
        Ok(())
    }
}
