//! Geocode Preparation Library
//!
//! Builds the code-keyed coordinate lookup tables used by the emissions
//! dashboard from four raw French reference datasets.
//!
//! This library provides tools for:
//! - Reading raw postal, rail station and airport registries with polars
//! - Normalizing source-specific codes (INSEE, truncated UIC, prefixed TVS, IATA)
//! - Extracting canonical `lat`/`lon` pairs from combined or separate columns
//! - Writing immutable lookup artifacts (JSON or Parquet) atomically
//! - Reading artifacts back for code-to-coordinate queries
//! - Reading per-structure rows of the cleaned emissions dataset
//!
//! Each source is prepared in isolation: one failing source never prevents
//! the others from producing their artifacts.
//!
//! ```no_run
//! use geocode_prep::{GeoLookup, PrepConfig, PrepPipeline, Source};
//! use geocode_prep::config::ArtifactFormat;
//!
//! # async fn example() -> geocode_prep::Result<()> {
//! let config = PrepConfig::default().with_raw_dir("/data/raw/chorus-dt");
//! let report = PrepPipeline::new(config)?.run().await;
//! assert!(report.is_success());
//!
//! let postal = GeoLookup::open("/data/prepared".as_ref(), Source::Insee, ArtifactFormat::Json)?;
//! let (lat, lon) = postal.coordinates("75114").unwrap_or_default();
//! println!("{} {}", lat, lon);
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod cli;
pub mod config;
pub mod constants;
pub mod emissions;
pub mod error;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod pipeline;

// Re-export commonly used types
pub use artifact::{ArtifactWriter, GeoLookup};
pub use config::PrepConfig;
pub use emissions::StructureDataReader;
pub use error::{PrepError, Result};
pub use loader::ReferenceLoader;
pub use models::{BatchReport, GeoRecord, LookupTable, Source};
pub use pipeline::PrepPipeline;
