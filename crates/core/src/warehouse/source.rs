//! CSV source file probing

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::WarehouseError;

/// A delimited source file on disk, read-only input to the ingest stage.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

/// Summary of a probed CSV file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvSummary {
    /// Column names from the header row
    pub columns: Vec<String>,
    /// Number of data rows (excluding the header)
    pub data_rows: u64,
    /// File size in bytes
    pub size_bytes: u64,
}

impl CsvSource {
    /// Create a source for the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the source path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check that the file exists and is a readable regular file
    pub fn check_readable(&self) -> Result<(), WarehouseError> {
        if !self.path.exists() {
            return Err(WarehouseError::SourceNotFound(self.path.clone()));
        }
        let metadata = fs::metadata(&self.path)?;
        if !metadata.is_file() {
            return Err(WarehouseError::SourceUnreadable {
                path: self.path.clone(),
                reason: "not a regular file".to_string(),
            });
        }
        fs::File::open(&self.path).map_err(|e| WarehouseError::SourceUnreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    /// Read the header and count data rows
    ///
    /// The summary drives the schema assertion after ingest: header columns
    /// must match the table columns and `data_rows` must match the table
    /// row count.
    pub fn probe(&self) -> Result<CsvSummary, WarehouseError> {
        self.check_readable()?;
        let size_bytes = fs::metadata(&self.path)?.len();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        let mut data_rows = 0u64;
        for record in reader.records() {
            record?;
            data_rows += 1;
        }

        Ok(CsvSummary {
            columns,
            data_rows,
            size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn test_probe_counts_data_rows() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "people.csv", "id,name,age\n1,ada,36\n2,grace,45\n3,edsger,72\n");

        let summary = CsvSource::new(&path).probe().unwrap();
        assert_eq!(summary.columns, vec!["id", "name", "age"]);
        assert_eq!(summary.data_rows, 3);
        assert!(summary.size_bytes > 0);
    }

    #[test]
    fn test_probe_header_only_file() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "empty.csv", "id,name\n");

        let summary = CsvSource::new(&path).probe().unwrap();
        assert_eq!(summary.columns.len(), 2);
        assert_eq!(summary.data_rows, 0);
    }

    #[test]
    fn test_probe_missing_file() {
        let dir = TempDir::new().unwrap();
        let source = CsvSource::new(dir.path().join("nope.csv"));

        let err = source.probe().unwrap_err();
        assert!(matches!(err, WarehouseError::SourceNotFound(_)));
    }

    #[test]
    fn test_probe_trims_header_whitespace() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "padded.csv", "id , name\n1,x\n");

        let summary = CsvSource::new(&path).probe().unwrap();
        assert_eq!(summary.columns, vec!["id", "name"]);
    }
}
