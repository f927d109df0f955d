//! Core data structures and types for reference preparation.
//!
//! Defines the reference sources, the typed lookup record and table,
//! and the per-source and batch statistics reported by the pipeline.

use crate::constants;
use crate::error::PrepError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Reference datasets turned into lookup artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Postal registry keyed by INSEE commune code
    Insee,
    /// Rail station list keyed by truncated UIC code
    Uic,
    /// Passenger station referential keyed by prefixed TVS code
    Tvs,
    /// Airport registry keyed by IATA code
    Iata,
}

impl Source {
    /// All sources in canonical reporting order
    pub const ALL: [Source; 4] = [Source::Insee, Source::Uic, Source::Tvs, Source::Iata];

    /// Short lowercase name used on the command line and in reports
    pub fn name(&self) -> &'static str {
        match self {
            Source::Insee => "insee",
            Source::Uic => "uic",
            Source::Tvs => "tvs",
            Source::Iata => "iata",
        }
    }

    /// Raw snapshot file name under the raw data directory
    pub fn raw_file_name(&self) -> &'static str {
        match self {
            Source::Insee => constants::insee::FILE_NAME,
            Source::Uic => constants::uic::FILE_NAME,
            Source::Tvs => constants::tvs::FILE_NAME,
            Source::Iata => constants::iata::FILE_NAME,
        }
    }

    /// Artifact base name under the prepared data directory
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Source::Insee => constants::insee::ARTIFACT,
            Source::Uic => constants::uic::ARTIFACT,
            Source::Tvs => constants::tvs::ARTIFACT,
            Source::Iata => constants::iata::ARTIFACT,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Source {
    type Err = PrepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insee" | "postal" => Ok(Source::Insee),
            "uic" => Ok(Source::Uic),
            "tvs" => Ok(Source::Tvs),
            "iata" | "airport" => Ok(Source::Iata),
            other => Err(PrepError::Configuration {
                message: format!(
                    "Unknown source '{}' (expected one of: insee, uic, tvs, iata)",
                    other
                ),
            }),
        }
    }
}

/// Coordinates of one code plus the passthrough columns of its raw row
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeoRecord {
    pub lat: f64,
    pub lon: f64,
    pub extra: BTreeMap<String, String>,
}

impl GeoRecord {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, extra: BTreeMap<String, String>) -> Self {
        self.extra = extra;
        self
    }
}

/// Code-keyed lookup table for one source
///
/// Keys are kept sorted so that serializing the same table twice yields
/// identical bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    source: Source,
    records: BTreeMap<String, GeoRecord>,
}

impl LookupTable {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            records: BTreeMap::new(),
        }
    }

    pub fn source(&self) -> Source {
        self.source
    }

    /// Insert a record, returning the record it replaced if the key was taken
    pub fn insert(&mut self, code: impl Into<String>, record: GeoRecord) -> Option<GeoRecord> {
        self.records.insert(code.into(), record)
    }

    pub fn get(&self, code: &str) -> Option<&GeoRecord> {
        self.records.get(code)
    }

    /// `(lat, lon)` for a code
    pub fn coordinates(&self, code: &str) -> Option<(f64, f64)> {
        self.records.get(code).map(|record| (record.lat, record.lon))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.records.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GeoRecord)> {
        self.records.iter()
    }

    /// Sorted union of passthrough column names across all records
    pub fn extra_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .records
            .values()
            .flat_map(|record| record.extra.keys().cloned())
            .collect();
        columns.sort();
        columns.dedup();
        columns
    }
}

/// Row accounting for one loader run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    /// Data rows in the raw file
    pub rows_read: usize,
    /// Rows dropped for a missing code or coordinate
    pub rows_dropped: usize,
    /// Rows whose key replaced an earlier row's key
    pub keys_overwritten: usize,
    /// Records in the final table
    pub records: usize,
}

/// Successful outcome of one source
#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: Source,
    pub stats: LoadStats,
    pub artifact_path: PathBuf,
    pub elapsed: Duration,
}

/// Result of one source within a batch
#[derive(Debug)]
pub struct SourceOutcome {
    pub source: Source,
    pub result: crate::error::Result<SourceReport>,
}

impl SourceOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-source results of a preparation batch, in canonical source order
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<SourceOutcome>,
    pub elapsed: Duration,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &SourceReport> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (Source, &PrepError)> {
        self.outcomes.iter().filter_map(|outcome| {
            outcome
                .result
                .as_ref()
                .err()
                .map(|error| (outcome.source, error))
        })
    }

    pub fn failure_count(&self) -> usize {
        self.failed().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn outcome(&self, source: Source) -> Option<&SourceOutcome> {
        self.outcomes.iter().find(|outcome| outcome.source == source)
    }
}
