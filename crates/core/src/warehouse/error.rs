//! Error types for warehouse operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while working with the warehouse database
#[derive(Error, Debug)]
pub enum WarehouseError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Source file does not exist
    #[error("Source file not found: {0}")]
    SourceNotFound(PathBuf),

    /// Source file exists but cannot be read
    #[error("Source file not readable: {path}: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// Target table name is not a plain SQL identifier
    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    /// Loaded table does not match the source file
    #[error("Schema mismatch for table '{table}': {detail}")]
    SchemaMismatch { table: String, detail: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl WarehouseError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            WarehouseError::SourceNotFound(path) => {
                format!(
                    "Source file not found: {}\n\nHint: Check that the file exists and the path is correct.",
                    path.display()
                )
            }
            WarehouseError::InvalidTableName(name) => {
                format!(
                    "Invalid table name: {name}\n\n\
                    Hint: Table names must start with a letter or underscore and contain only letters, digits, and underscores."
                )
            }
            WarehouseError::SchemaMismatch { table, detail } => {
                format!(
                    "Table '{table}' does not match the source file: {detail}\n\n\
                    Hint: The table was created by an earlier run. Drop it or choose another table name."
                )
            }
            _ => self.to_string(),
        }
    }
}

impl From<duckdb::Error> for WarehouseError {
    fn from(err: duckdb::Error) -> Self {
        WarehouseError::Database(err.to_string())
    }
}
