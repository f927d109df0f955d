//! Error handling for reference preparation operations.
//!
//! File- and schema-level failures abort the affected source only; the
//! orchestrator collects them per source instead of stopping the batch.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("File not found: {path}")]
    MissingFile { path: PathBuf },

    #[error("Missing column '{column}' in {source_name} file: {path}")]
    MissingColumn {
        source_name: String,
        column: String,
        path: PathBuf,
    },

    #[error("Malformed row {row} in {source_name} data: '{value}' ({reason})")]
    MalformedRow {
        source_name: String,
        row: usize,
        value: String,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl PrepError {
    /// Short name of the error kind, used in batch reports
    pub fn kind(&self) -> &'static str {
        match self {
            PrepError::Io(_) => "IoError",
            PrepError::Polars(_) => "PolarsError",
            PrepError::Json(_) => "JsonError",
            PrepError::MissingFile { .. } => "MissingFileError",
            PrepError::MissingColumn { .. } => "MissingColumnError",
            PrepError::MalformedRow { .. } => "MalformedRowError",
            PrepError::Configuration { .. } => "ConfigurationError",
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
