//! Lookup artifact serialization and read-back.
//!
//! Artifacts are immutable: [`ArtifactWriter`] writes into a temporary file
//! next to the destination and renames it into place, so readers never see a
//! half-written table and a failed source leaves the previous artifact
//! untouched. [`GeoLookup`] loads an artifact back for code-to-coordinate
//! queries.
//!
//! The JSON layout is column-major, keyed first by column then by code:
//!
//! ```text
//! { "lat": { "75114": 48.83 }, "lon": { "75114": 2.33 }, "Nom_commune": { "75114": "PARIS 14" } }
//! ```

use crate::config::ArtifactFormat;
use crate::constants::{CODE, LAT, LON};
use crate::error::{PrepError, Result};
use crate::models::{GeoRecord, LookupTable, Source};
use crate::normalize::parse_degrees;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A single cell of a JSON artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactValue {
    Number(f64),
    Text(String),
}

impl ArtifactValue {
    fn as_degrees(&self) -> std::result::Result<f64, String> {
        match self {
            ArtifactValue::Number(value) => Ok(*value),
            ArtifactValue::Text(text) => parse_degrees(text).map_err(|e| e.reason),
        }
    }

    fn into_text(self) -> String {
        match self {
            ArtifactValue::Number(value) => value.to_string(),
            ArtifactValue::Text(text) => text,
        }
    }
}

/// Column-major view: column name -> code -> value
pub type ArtifactColumns = BTreeMap<String, BTreeMap<String, ArtifactValue>>;

/// Convert a table to its column-major artifact shape
pub fn to_columns(table: &LookupTable) -> ArtifactColumns {
    let mut columns: ArtifactColumns = BTreeMap::new();
    let mut lat = BTreeMap::new();
    let mut lon = BTreeMap::new();

    for (code, record) in table.iter() {
        lat.insert(code.clone(), ArtifactValue::Number(record.lat));
        lon.insert(code.clone(), ArtifactValue::Number(record.lon));
        for (name, value) in &record.extra {
            columns
                .entry(name.clone())
                .or_default()
                .insert(code.clone(), ArtifactValue::Text(value.clone()));
        }
    }

    columns.insert(LAT.to_string(), lat);
    columns.insert(LON.to_string(), lon);
    columns
}

/// Rebuild a table from its column-major artifact shape.
///
/// Every code listed under `lat` must also appear under `lon`.
pub fn from_columns(source: Source, mut columns: ArtifactColumns, path: &Path) -> Result<LookupTable> {
    let missing_column = |column: &str| PrepError::MissingColumn {
        source_name: source.name().to_string(),
        column: column.to_string(),
        path: path.to_path_buf(),
    };
    let lat = columns.remove(LAT).ok_or_else(|| missing_column(LAT))?;
    let mut lon = columns.remove(LON).ok_or_else(|| missing_column(LON))?;

    let mut records = BTreeMap::new();
    for (row, (code, lat_value)) in lat.into_iter().enumerate() {
        let malformed = |value: String, reason: String| PrepError::MalformedRow {
            source_name: source.name().to_string(),
            row: row + 1,
            value,
            reason,
        };
        let lon_value = lon
            .remove(&code)
            .ok_or_else(|| malformed(code.clone(), "code has no longitude".to_string()))?;
        let lat = lat_value
            .as_degrees()
            .map_err(|reason| malformed(code.clone(), reason))?;
        let lon = lon_value
            .as_degrees()
            .map_err(|reason| malformed(code.clone(), reason))?;
        records.insert(code, GeoRecord::new(lat, lon));
    }

    for (name, values) in columns {
        for (code, value) in values {
            if let Some(record) = records.get_mut(&code) {
                record.extra.insert(name.clone(), value.into_text());
            }
        }
    }

    let mut table = LookupTable::new(source);
    for (code, record) in records {
        table.insert(code, record);
    }
    Ok(table)
}

/// Writes lookup tables into the prepared data directory
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    prepared_dir: PathBuf,
    format: ArtifactFormat,
}

impl ArtifactWriter {
    pub fn new(prepared_dir: impl Into<PathBuf>, format: ArtifactFormat) -> Self {
        Self {
            prepared_dir: prepared_dir.into(),
            format,
        }
    }

    pub fn artifact_path(&self, source: Source) -> PathBuf {
        self.format.artifact_path(&self.prepared_dir, source)
    }

    /// Write the table's artifact, replacing any previous one atomically
    pub fn write(&self, table: &LookupTable) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.prepared_dir)?;
        let path = self.artifact_path(table.source());

        let mut temp = NamedTempFile::new_in(&self.prepared_dir)?;
        match self.format {
            ArtifactFormat::Json => write_json(table, temp.as_file_mut())?,
            ArtifactFormat::Parquet => write_parquet(table, temp.as_file_mut())?,
        }
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| PrepError::Io(e.error))?;

        debug!(
            "Wrote {} {} records to {}",
            table.len(),
            table.source(),
            path.display()
        );
        Ok(path)
    }
}

fn write_json(table: &LookupTable, file: &mut File) -> Result<()> {
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &to_columns(table))?;
    writer.flush()?;
    Ok(())
}

fn write_parquet(table: &LookupTable, file: &mut File) -> Result<()> {
    let mut df = to_dataframe(table)?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df)?;
    Ok(())
}

/// Row-oriented frame: `code`, `lat`, `lon`, then passthrough columns sorted by name
pub fn to_dataframe(table: &LookupTable) -> Result<DataFrame> {
    let codes: Vec<&str> = table.iter().map(|(code, _)| code.as_str()).collect();
    let lats: Vec<f64> = table.iter().map(|(_, record)| record.lat).collect();
    let lons: Vec<f64> = table.iter().map(|(_, record)| record.lon).collect();

    let mut columns = vec![
        Column::new(CODE.into(), codes),
        Column::new(LAT.into(), lats),
        Column::new(LON.into(), lons),
    ];
    for name in table.extra_columns() {
        let values: Vec<Option<&str>> = table
            .iter()
            .map(|(_, record)| record.extra.get(&name).map(String::as_str))
            .collect();
        columns.push(Column::new(name.as_str().into(), values));
    }

    Ok(DataFrame::new(columns)?)
}

/// Rebuild a table from a row-oriented frame written by [`to_dataframe`]
pub fn from_dataframe(source: Source, df: &DataFrame, path: &Path) -> Result<LookupTable> {
    for column in [CODE, LAT, LON] {
        if df.column(column).is_err() {
            return Err(PrepError::MissingColumn {
                source_name: source.name().to_string(),
                column: column.to_string(),
                path: path.to_path_buf(),
            });
        }
    }

    let codes = df.column(CODE)?.str()?;
    let lats = df.column(LAT)?.f64()?;
    let lons = df.column(LON)?.f64()?;
    let extras: Vec<(String, &StringChunked)> = df
        .get_columns()
        .iter()
        .filter(|c| ![CODE, LAT, LON].contains(&c.name().as_str()))
        .map(|c| Ok((c.name().to_string(), c.str()?)))
        .collect::<PolarsResult<_>>()?;

    let mut table = LookupTable::new(source);
    for row in 0..df.height() {
        let (Some(code), Some(lat), Some(lon)) = (codes.get(row), lats.get(row), lons.get(row))
        else {
            return Err(PrepError::MalformedRow {
                source_name: source.name().to_string(),
                row: row + 1,
                value: codes.get(row).unwrap_or_default().to_string(),
                reason: "null code or coordinate in artifact".to_string(),
            });
        };

        let mut extra = BTreeMap::new();
        for (name, values) in &extras {
            if let Some(value) = values.get(row) {
                extra.insert(name.clone(), value.to_string());
            }
        }
        table.insert(code, GeoRecord::new(lat, lon).with_extra(extra));
    }
    Ok(table)
}

/// Read-only code-to-coordinate lookup over one artifact.
///
/// Built once and passed to whatever needs it; it holds no global state.
#[derive(Debug, Clone)]
pub struct GeoLookup {
    table: LookupTable,
    path: PathBuf,
}

impl GeoLookup {
    /// Open the artifact of `source` under `prepared_dir`
    pub fn open(prepared_dir: &Path, source: Source, format: ArtifactFormat) -> Result<Self> {
        let path = format.artifact_path(prepared_dir, source);
        Self::from_path(&path, source, format)
    }

    pub fn from_path(path: &Path, source: Source, format: ArtifactFormat) -> Result<Self> {
        if !path.is_file() {
            return Err(PrepError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let table = match format {
            ArtifactFormat::Json => {
                let reader = BufReader::new(File::open(path)?);
                let columns: ArtifactColumns = serde_json::from_reader(reader)?;
                from_columns(source, columns, path)?
            }
            ArtifactFormat::Parquet => {
                let df = ParquetReader::new(File::open(path)?).finish()?;
                from_dataframe(source, &df, path)?
            }
        };

        debug!(
            "Opened {} lookup with {} codes from {}",
            source,
            table.len(),
            path.display()
        );
        Ok(Self {
            table,
            path: path.to_path_buf(),
        })
    }

    pub fn coordinates(&self, code: &str) -> Option<(f64, f64)> {
        self.table.coordinates(code)
    }

    pub fn get(&self, code: &str) -> Option<&GeoRecord> {
        self.table.get(code)
    }

    pub fn table(&self) -> &LookupTable {
        &self.table
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_table() -> LookupTable {
        let mut table = LookupTable::new(Source::Insee);
        let mut extra = BTreeMap::new();
        extra.insert("Nom_commune".to_string(), "PARIS 14".to_string());
        table.insert("75114", GeoRecord::new(48.83, 2.33).with_extra(extra));
        table.insert("01001", GeoRecord::new(46.15, 4.92));
        table
    }

    #[test]
    fn test_column_major_shape() {
        let columns = to_columns(&sample_table());

        assert_eq!(columns["lat"]["75114"], ArtifactValue::Number(48.83));
        assert_eq!(columns["lon"]["75114"], ArtifactValue::Number(2.33));
        assert_eq!(
            columns["Nom_commune"]["75114"],
            ArtifactValue::Text("PARIS 14".to_string())
        );
        assert!(!columns["Nom_commune"].contains_key("01001"));
    }

    #[test]
    fn test_json_artifact_text() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(temp_dir.path(), ArtifactFormat::Json);
        let path = writer.write(&sample_table()).unwrap();

        assert_eq!(path, temp_dir.path().join("insee_codes.json"));
        let text = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["lat"]["75114"], serde_json::json!(48.83));
        assert_eq!(value["lon"]["01001"], serde_json::json!(4.92));
    }

    #[test]
    fn test_json_lookup() {
        let temp_dir = TempDir::new().unwrap();
        ArtifactWriter::new(temp_dir.path(), ArtifactFormat::Json)
            .write(&sample_table())
            .unwrap();

        let lookup = GeoLookup::open(temp_dir.path(), Source::Insee, ArtifactFormat::Json).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.coordinates("75114"), Some((48.83, 2.33)));
        assert_eq!(lookup.coordinates("99999"), None);
        assert_eq!(lookup.table(), &sample_table());
    }

    #[test]
    fn test_parquet_lookup() {
        let temp_dir = TempDir::new().unwrap();
        let path = ArtifactWriter::new(temp_dir.path(), ArtifactFormat::Parquet)
            .write(&sample_table())
            .unwrap();
        assert_eq!(path, temp_dir.path().join("insee_codes.parquet"));

        let lookup =
            GeoLookup::open(temp_dir.path(), Source::Insee, ArtifactFormat::Parquet).unwrap();
        assert_eq!(lookup.coordinates("01001"), Some((46.15, 4.92)));
        assert_eq!(
            lookup.get("75114").unwrap().extra.get("Nom_commune").unwrap(),
            "PARIS 14"
        );
        assert!(lookup.get("01001").unwrap().extra.is_empty());
    }

    #[test]
    fn test_lookup_accepts_string_coordinates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tvs_codes.json");
        std::fs::write(
            &path,
            r#"{"lat": {"TR_FRECO": "47.8266"}, "lon": {"TR_FRECO": 0.2733}, "TVS": {"TR_FRECO": "ECO"}}"#,
        )
        .unwrap();

        let lookup = GeoLookup::from_path(&path, Source::Tvs, ArtifactFormat::Json).unwrap();
        assert_eq!(lookup.coordinates("TR_FRECO"), Some((47.8266, 0.2733)));
        assert_eq!(lookup.get("TR_FRECO").unwrap().extra["TVS"], "ECO");
    }

    #[test]
    fn test_lookup_missing_longitude() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("iata_codes.json");
        std::fs::write(&path, r#"{"lat": {"CDG": 49.0128}, "lon": {}}"#).unwrap();

        assert!(matches!(
            GeoLookup::from_path(&path, Source::Iata, ArtifactFormat::Json),
            Err(PrepError::MalformedRow { .. })
        ));
    }

    #[test]
    fn test_lookup_missing_artifact() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            GeoLookup::open(temp_dir.path(), Source::Uic, ArtifactFormat::Json),
            Err(PrepError::MissingFile { .. })
        ));
    }

    #[test]
    fn test_write_replaces_previous_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(temp_dir.path(), ArtifactFormat::Json);
        writer.write(&sample_table()).unwrap();

        let mut smaller = LookupTable::new(Source::Insee);
        smaller.insert("13055", GeoRecord::new(43.3, 5.4));
        writer.write(&smaller).unwrap();

        let lookup = GeoLookup::open(temp_dir.path(), Source::Insee, ArtifactFormat::Json).unwrap();
        assert_eq!(lookup.len(), 1);
        assert!(lookup.get("75114").is_none());

        let leftovers = std::fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
