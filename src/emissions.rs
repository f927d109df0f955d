//! Structure-level access to the cleaned emissions dataset.
//!
//! The dashboard pages need the emissions rows of one building structure,
//! optionally for a single year. [`StructureDataReader`] reads the cleaned
//! dataset once; callers construct it at start-up and pass it to whatever
//! needs it.

use crate::constants::emissions::{STRUCTURE_ID, YEAR};
use crate::error::{PrepError, Result};
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Emissions dataset held in memory, filtered per structure on demand
#[derive(Debug, Clone)]
pub struct StructureDataReader {
    data: DataFrame,
    path: PathBuf,
}

impl StructureDataReader {
    /// Read the cleaned emissions CSV at `path`
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(PrepError::MissingFile {
                path: path.to_path_buf(),
            });
        }

        let data = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;

        info!(
            "Loaded emissions dataset: {} rows from {}",
            data.height(),
            path.display()
        );
        Self::from_dataframe(data, path)
    }

    /// Wrap an already-loaded frame; it must contain the structure id column
    pub fn from_dataframe(data: DataFrame, path: &Path) -> Result<Self> {
        let reader = Self {
            data,
            path: path.to_path_buf(),
        };
        reader.require_column(STRUCTURE_ID)?;
        Ok(reader)
    }

    /// Rows of one structure, restricted to `year` when given
    pub fn structure_data(&self, structure_id: &str, year: Option<i32>) -> Result<DataFrame> {
        let mut predicate = col(STRUCTURE_ID).eq(lit(structure_id.to_string()));
        if let Some(year) = year {
            self.require_column(YEAR)?;
            predicate = predicate.and(col(YEAR).eq(lit(year.to_string())));
        }

        let rows = self.data.clone().lazy().filter(predicate).collect()?;
        debug!(
            "Structure {} (year {:?}): {} rows",
            structure_id,
            year,
            rows.height()
        );
        Ok(rows)
    }

    pub fn row_count(&self) -> usize {
        self.data.height()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn require_column(&self, column: &str) -> Result<()> {
        if self.data.column(column).is_err() {
            return Err(PrepError::MissingColumn {
                source_name: "emissions".to_string(),
                column: column.to_string(),
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const DATASET: &str = "id,Nom du bien,Année,Date,Emissions électricité\n\
                           S001,Préfecture,2019,2019-01-01,12.5\n\
                           S001,Préfecture,2020,2020-01-01,11.0\n\
                           S002,Tribunal,2020,2020-01-01,8.2\n";

    fn write_dataset(temp_dir: &TempDir, contents: &str) -> PathBuf {
        let path = temp_dir.path().join("data_osfi.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_structure_rows() {
        let temp_dir = TempDir::new().unwrap();
        let reader = StructureDataReader::load(&write_dataset(&temp_dir, DATASET)).unwrap();

        assert_eq!(reader.row_count(), 3);
        assert_eq!(reader.structure_data("S001", None).unwrap().height(), 2);
        assert_eq!(reader.structure_data("S002", None).unwrap().height(), 1);
        assert_eq!(reader.structure_data("S999", None).unwrap().height(), 0);
    }

    #[test]
    fn test_structure_rows_for_year() {
        let temp_dir = TempDir::new().unwrap();
        let reader = StructureDataReader::load(&write_dataset(&temp_dir, DATASET)).unwrap();

        let rows = reader.structure_data("S001", Some(2020)).unwrap();
        assert_eq!(rows.height(), 1);
        let emissions = rows.column("Emissions électricité").unwrap().str().unwrap();
        assert_eq!(emissions.get(0), Some("11.0"));
    }

    #[test]
    fn test_missing_dataset() {
        let temp_dir = TempDir::new().unwrap();
        assert!(matches!(
            StructureDataReader::load(&temp_dir.path().join("absent.csv")),
            Err(PrepError::MissingFile { .. })
        ));
    }

    #[test]
    fn test_missing_columns() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_dataset(&temp_dir, "code,Année\nS001,2020\n");
        assert!(matches!(
            StructureDataReader::load(&path),
            Err(PrepError::MissingColumn { .. })
        ));

        let path = write_dataset(&temp_dir, "id,Nom du bien\nS001,Préfecture\n");
        let reader = StructureDataReader::load(&path).unwrap();
        assert!(reader.structure_data("S001", None).is_ok());
        assert!(matches!(
            reader.structure_data("S001", Some(2020)),
            Err(PrepError::MissingColumn { .. })
        ));
    }
}
