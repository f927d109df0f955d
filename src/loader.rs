//! Reference loading: raw CSV snapshot to code-keyed lookup table.
//!
//! One [`ReferenceLoader`] exists per source. It reads the raw file with
//! polars (every column as a string), checks that the expected columns are
//! present, drops rows with a missing code or coordinate and applies the
//! source's [`CodeRule`](crate::normalize::CodeRule) and
//! [`CoordinateRule`](crate::normalize::CoordinateRule) to the rest.

use crate::error::{PrepError, Result};
use crate::models::{GeoRecord, LoadStats, LookupTable, Source};
use crate::normalize::{FieldError, SourceLayout};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Loads one raw reference snapshot into a [`LookupTable`]
#[derive(Debug, Clone)]
pub struct ReferenceLoader {
    layout: SourceLayout,
    passthrough: bool,
}

impl ReferenceLoader {
    pub fn new(source: Source) -> Self {
        Self {
            layout: SourceLayout::for_source(source),
            passthrough: true,
        }
    }

    /// Enable or disable passthrough columns in the produced records
    pub fn with_passthrough(mut self, passthrough: bool) -> Self {
        self.passthrough = passthrough;
        self
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.layout
    }

    pub fn source(&self) -> Source {
        self.layout.source
    }

    /// Read the raw file at `path` and build the lookup table
    pub fn load(&self, path: &Path) -> Result<(LookupTable, LoadStats)> {
        let start_time = Instant::now();
        info!(
            "Loading {} reference data from {}",
            self.layout.source,
            path.display()
        );

        let df = read_raw_csv(path, self.layout.delimiter)?;
        let (table, stats) = self.build_table(&df, path)?;

        info!(
            "Loaded {} {} codes ({} rows read, {} dropped, {} overwritten) in {:.2}s",
            stats.records,
            self.layout.source,
            stats.rows_read,
            stats.rows_dropped,
            stats.keys_overwritten,
            start_time.elapsed().as_secs_f64()
        );

        Ok((table, stats))
    }

    /// Build the lookup table from an already-read raw frame.
    ///
    /// `path` is only used in error messages.
    pub fn build_table(&self, df: &DataFrame, path: &Path) -> Result<(LookupTable, LoadStats)> {
        let source_name = self.layout.source.name();
        let expected = self.layout.expected_columns();

        for column in &expected {
            if df.column(column).is_err() {
                return Err(PrepError::MissingColumn {
                    source_name: source_name.to_string(),
                    column: column.to_string(),
                    path: path.to_path_buf(),
                });
            }
        }

        let required: Vec<&StringChunked> = expected
            .iter()
            .map(|name| df.column(name).and_then(|c| c.str()))
            .collect::<PolarsResult<_>>()?;
        let code_values = df.column(self.layout.code_column)?.str()?;
        let coordinate_values: Vec<&StringChunked> = self
            .layout
            .coordinates
            .columns()
            .iter()
            .map(|name| df.column(name).and_then(|c| c.str()))
            .collect::<PolarsResult<_>>()?;

        let passthrough_columns: Vec<(String, &StringChunked)> = if self.passthrough {
            df.get_columns()
                .iter()
                .filter(|c| self.layout.is_passthrough(c.name().as_str()))
                .map(|c| Ok((c.name().to_string(), c.str()?)))
                .collect::<PolarsResult<_>>()?
        } else {
            Vec::new()
        };

        let mut table = LookupTable::new(self.layout.source);
        let mut stats = LoadStats::default();
        let malformed = |row: usize, error: FieldError| PrepError::MalformedRow {
            source_name: source_name.to_string(),
            row: row + 1,
            value: error.value,
            reason: error.reason,
        };

        for row in 0..df.height() {
            stats.rows_read += 1;

            if required.iter().any(|values| is_missing(values.get(row))) {
                stats.rows_dropped += 1;
                continue;
            }

            let raw_code = code_values.get(row).unwrap_or_default();
            let code = self
                .layout
                .code_rule
                .derive(raw_code)
                .map_err(|e| malformed(row, e))?;

            let coordinates: Vec<&str> = coordinate_values
                .iter()
                .map(|values| values.get(row).unwrap_or_default())
                .collect();
            let (lat, lon) = self
                .layout
                .coordinates
                .extract(&coordinates)
                .map_err(|e| malformed(row, e))?;

            let mut extra = BTreeMap::new();
            for (name, values) in &passthrough_columns {
                if let Some(value) = values.get(row).filter(|v| !v.trim().is_empty()) {
                    extra.insert(name.clone(), value.to_string());
                }
            }

            if table
                .insert(code.clone(), GeoRecord::new(lat, lon).with_extra(extra))
                .is_some()
            {
                stats.keys_overwritten += 1;
                debug!(
                    "{} key '{}' seen again at row {}, keeping the later row",
                    source_name,
                    code,
                    row + 1
                );
            }
        }

        stats.records = table.len();
        debug!(
            "{}: {} rows dropped for missing code or coordinates",
            source_name, stats.rows_dropped
        );

        Ok((table, stats))
    }
}

/// Read a raw CSV snapshot with every column typed as a string.
///
/// Empty cells become nulls. A leading byte order mark and surrounding
/// whitespace are stripped from column names.
pub fn read_raw_csv(path: &Path, delimiter: u8) -> Result<DataFrame> {
    if !path.is_file() {
        return Err(PrepError::MissingFile {
            path: path.to_path_buf(),
        });
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_separator(delimiter)
                .with_encoding(CsvEncoding::LossyUtf8)
        })
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let renames: Vec<(String, String)> = df
        .get_column_names()
        .iter()
        .filter_map(|name| {
            let cleaned = name.trim_start_matches(BYTE_ORDER_MARK).trim();
            (cleaned != name.as_str()).then(|| (name.to_string(), cleaned.to_string()))
        })
        .collect();
    for (old, new) in renames {
        df.rename(&old, new.into())?;
    }

    debug!(
        "Read {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

fn is_missing(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}
