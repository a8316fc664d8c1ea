//! Warehouse database implementation

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::WarehouseError;
use super::source::{CsvSource, CsvSummary};

/// Warehouse over an embedded DuckDB database file
///
/// Both pipeline stages operate on the same database file, never
/// concurrently: the ingest stage owns the connection and drops it before
/// the transformation engine opens its own.
pub struct Warehouse {
    conn: duckdb::Connection,
    path: Option<String>,
}

/// Report from a single CSV ingest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Target table name
    pub table: String,
    /// Row count of the table after the ingest
    pub rows: i64,
    /// Column count of the table
    pub columns: usize,
    /// True when the table already existed and the load was skipped
    pub skipped: bool,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl Warehouse {
    /// Open or create a warehouse database at the given path
    pub fn open(path: &str) -> Result<Self, WarehouseError> {
        let conn = duckdb::Connection::open(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn memory() -> Result<Self, WarehouseError> {
        let conn = duckdb::Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Get the database path (if not in-memory)
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Load a CSV file into the named table
    ///
    /// Safe to re-run: if the table already exists the load is skipped and
    /// the report carries the current row count. Column names and types are
    /// inferred by DuckDB from the file's header and content.
    pub fn ingest_csv(
        &self,
        table: &str,
        source: &CsvSource,
    ) -> Result<IngestReport, WarehouseError> {
        let start = Instant::now();
        validate_identifier(table)?;
        source.check_readable()?;

        if self.table_exists(table)? {
            debug!(table, "Table already exists, skipping load");
            return Ok(IngestReport {
                table: table.to_string(),
                rows: self.row_count(table)?,
                columns: self.columns(table)?.len(),
                skipped: true,
                duration_ms: start.elapsed().as_millis() as u64,
            });
        }

        let path_literal = source.path().display().to_string().replace('\'', "''");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" AS SELECT * FROM read_csv('{path_literal}')"
        );
        self.conn.execute_batch(&sql)?;

        let rows = self.row_count(table)?;
        let columns = self.columns(table)?.len();
        info!(table, rows, columns, "Loaded CSV into warehouse");

        Ok(IngestReport {
            table: table.to_string(),
            rows,
            columns,
            skipped: false,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Check whether a table exists
    pub fn table_exists(&self, table: &str) -> Result<bool, WarehouseError> {
        let result: Result<i32, _> = self.conn.query_row(
            "SELECT 1 FROM information_schema.tables WHERE table_name = ?1",
            [table],
            |row| row.get(0),
        );
        Ok(result.is_ok())
    }

    /// Get the row count of a table
    pub fn row_count(&self, table: &str) -> Result<i64, WarehouseError> {
        validate_identifier(table)?;
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
                    row.get(0)
                })?;
        Ok(count)
    }

    /// Get the column names of a table in ordinal order
    pub fn columns(&self, table: &str) -> Result<Vec<String>, WarehouseError> {
        let mut stmt = self.conn.prepare(
            "SELECT column_name FROM information_schema.columns
             WHERE table_name = ?1 ORDER BY ordinal_position",
        )?;
        let rows = stmt.query_map([table], |row| row.get::<_, String>(0))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    /// Assert that a table matches its source file
    ///
    /// Column names are compared after trimming on both sides, since the
    /// database keeps whatever padding the raw header carried. Duplicate
    /// header names are disambiguated by the database on load, so for those
    /// only the column count is compared. The table row count must equal
    /// the CSV data-row count.
    pub fn assert_matches_source(
        &self,
        table: &str,
        summary: &CsvSummary,
    ) -> Result<(), WarehouseError> {
        let table_columns = self.columns(table)?;
        let table_trimmed: Vec<&str> = table_columns.iter().map(|c| c.trim()).collect();
        let expected: Vec<&str> = summary.columns.iter().map(|c| c.trim()).collect();

        let mut seen = std::collections::HashSet::new();
        let has_duplicates = expected.iter().any(|c| !seen.insert(*c));

        let columns_match = if has_duplicates {
            table_trimmed.len() == expected.len()
        } else {
            table_trimmed == expected
        };
        if !columns_match {
            return Err(WarehouseError::SchemaMismatch {
                table: table.to_string(),
                detail: format!(
                    "expected columns {:?}, found {:?}",
                    expected, table_columns
                ),
            });
        }

        let rows = self.row_count(table)?;
        if rows != summary.data_rows as i64 {
            return Err(WarehouseError::SchemaMismatch {
                table: table.to_string(),
                detail: format!("expected {} rows, found {}", summary.data_rows, rows),
            });
        }

        Ok(())
    }

    /// Execute a query and return results as JSON
    pub fn query(&self, sql: &str) -> Result<Vec<serde_json::Value>, WarehouseError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;

        // Get column names after query execution
        let column_count = rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let column_names: Vec<String> = (0..column_count)
            .map(|i| {
                rows.as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut results = Vec::new();

        while let Some(row) = rows.next()? {
            let mut obj = serde_json::Map::new();
            for (i, name) in column_names.iter().enumerate() {
                let value: duckdb::types::Value = row.get(i)?;
                let json_value = match value {
                    duckdb::types::Value::Null => serde_json::Value::Null,
                    duckdb::types::Value::Boolean(b) => serde_json::Value::Bool(b),
                    duckdb::types::Value::TinyInt(n) => serde_json::Value::Number(n.into()),
                    duckdb::types::Value::SmallInt(n) => serde_json::Value::Number(n.into()),
                    duckdb::types::Value::Int(n) => serde_json::Value::Number(n.into()),
                    duckdb::types::Value::BigInt(n) => serde_json::Value::Number(n.into()),
                    duckdb::types::Value::Float(f) => serde_json::Number::from_f64(f as f64)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null),
                    duckdb::types::Value::Double(f) => serde_json::Number::from_f64(f)
                        .map(serde_json::Value::Number)
                        .unwrap_or(serde_json::Value::Null),
                    duckdb::types::Value::Text(s) => serde_json::Value::String(s),
                    _ => serde_json::Value::String(format!("{:?}", value)),
                };
                obj.insert(name.clone(), json_value);
            }
            results.push(serde_json::Value::Object(obj));
        }

        Ok(results)
    }
}

/// Validate a plain SQL identifier for interpolation into DDL
fn validate_identifier(name: &str) -> Result<(), WarehouseError> {
    let mut chars = name.chars();
    let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    let tail_ok = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if head_ok && tail_ok {
        Ok(())
    } else {
        Err(WarehouseError::InvalidTableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", contents).unwrap();
        path
    }

    #[test]
    fn test_ingest_csv_creates_table() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "id,name\n1,ada\n2,grace\n");

        let db = Warehouse::memory().unwrap();
        let report = db.ingest_csv("people", &CsvSource::new(&path)).unwrap();

        assert!(!report.skipped);
        assert_eq!(report.rows, 2);
        assert_eq!(report.columns, 2);
        assert!(db.table_exists("people").unwrap());
        assert_eq!(db.row_count("people").unwrap(), 2);
    }

    #[test]
    fn test_ingest_csv_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "id,name\n1,ada\n2,grace\n3,edsger\n");
        let source = CsvSource::new(&path);

        let db = Warehouse::memory().unwrap();
        let first = db.ingest_csv("people", &source).unwrap();
        let second = db.ingest_csv("people", &source).unwrap();

        assert!(!first.skipped);
        assert!(second.skipped);
        assert_eq!(first.rows, 3);
        assert_eq!(second.rows, 3);
        assert_eq!(db.row_count("people").unwrap(), 3);
    }

    #[test]
    fn test_ingest_csv_missing_source() {
        let dir = TempDir::new().unwrap();
        let db = Warehouse::memory().unwrap();

        let err = db
            .ingest_csv("people", &CsvSource::new(dir.path().join("nope.csv")))
            .unwrap_err();
        assert!(matches!(err, WarehouseError::SourceNotFound(_)));
        assert!(!db.table_exists("people").unwrap());
    }

    #[test]
    fn test_ingest_csv_rejects_bad_table_name() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "id\n1\n");

        let db = Warehouse::memory().unwrap();
        let err = db
            .ingest_csv("people; DROP TABLE x", &CsvSource::new(&path))
            .unwrap_err();
        assert!(matches!(err, WarehouseError::InvalidTableName(_)));
    }

    #[test]
    fn test_columns_in_header_order() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "zulu,alpha,mike\n1,2,3\n");

        let db = Warehouse::memory().unwrap();
        db.ingest_csv("t", &CsvSource::new(&path)).unwrap();

        assert_eq!(db.columns("t").unwrap(), vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_assert_matches_source() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "id,name\n1,ada\n2,grace\n");
        let source = CsvSource::new(&path);

        let db = Warehouse::memory().unwrap();
        db.ingest_csv("people", &source).unwrap();

        let summary = source.probe().unwrap();
        db.assert_matches_source("people", &summary).unwrap();

        let wrong = CsvSummary {
            columns: vec!["id".to_string(), "email".to_string()],
            data_rows: 2,
            size_bytes: 0,
        };
        let err = db.assert_matches_source("people", &wrong).unwrap_err();
        assert!(matches!(err, WarehouseError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_assert_matches_source_padded_header() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "id , name\n1,x\n2,y\n");
        let source = CsvSource::new(&path);

        let db = Warehouse::memory().unwrap();
        db.ingest_csv("padded", &source).unwrap();

        let summary = source.probe().unwrap();
        db.assert_matches_source("padded", &summary).unwrap();
    }

    #[test]
    fn test_assert_matches_source_duplicate_header() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(&dir, "data.csv", "a,a\n1,2\n");
        let source = CsvSource::new(&path);

        let db = Warehouse::memory().unwrap();
        db.ingest_csv("doubled", &source).unwrap();

        let summary = source.probe().unwrap();
        db.assert_matches_source("doubled", &summary).unwrap();
    }

    #[test]
    fn test_query_returns_json_rows() {
        let db = Warehouse::memory().unwrap();
        let results = db.query("SELECT 1 as num, 'hello' as str").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["num"], 1);
        assert_eq!(results[0]["str"], "hello");
    }
}
