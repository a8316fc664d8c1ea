//! CLI commands for warehouse operations

use std::path::PathBuf;

use crate::error::CliError;
use duckflow_core::warehouse::{CsvSource, Warehouse};

/// Arguments for the `warehouse ingest` command
pub struct WarehouseIngestArgs {
    /// Path to the warehouse database file
    pub database: PathBuf,
    /// Source CSV file to ingest
    pub source: PathBuf,
    /// Target table name
    pub table: String,
}

/// Arguments for the `warehouse query` command
pub struct WarehouseQueryArgs {
    /// Path to the warehouse database file
    pub database: PathBuf,
    /// SQL query to execute
    pub sql: String,
    /// Output format (json, table)
    pub format: String,
}

/// Handle the `warehouse ingest` command
pub fn handle_warehouse_ingest(args: &WarehouseIngestArgs) -> Result<(), CliError> {
    let db_path = args.database.display().to_string();

    let db = Warehouse::open(&db_path).map_err(|e| CliError::WarehouseError(e.user_message()))?;

    println!("Starting ingestion from: {}", args.source.display());
    println!("Target table: {}", args.table);

    let source = CsvSource::new(&args.source);
    let report = db
        .ingest_csv(&args.table, &source)
        .map_err(|e| CliError::WarehouseError(e.user_message()))?;

    println!();
    if report.skipped {
        println!("Table {} already loaded, skipped.", report.table);
    } else {
        println!("Ingestion complete:");
    }
    println!("  Rows:     {}", report.rows);
    println!("  Columns:  {}", report.columns);
    println!("  Duration: {}ms", report.duration_ms);

    Ok(())
}

/// Handle the `warehouse query` command
pub fn handle_warehouse_query(args: &WarehouseQueryArgs) -> Result<(), CliError> {
    let db_path = args.database.display().to_string();

    let db = Warehouse::open(&db_path).map_err(|e| CliError::WarehouseError(e.user_message()))?;

    let results = db
        .query(&args.sql)
        .map_err(|e| CliError::WarehouseError(e.user_message()))?;

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&results)
                .map_err(|e| CliError::WarehouseError(e.to_string()))?;
            println!("{}", json);
        }
        "table" => {
            for row in &results {
                println!("{}", row);
            }
            eprintln!();
            eprintln!("{} rows", results.len());
        }
        other => {
            return Err(CliError::InvalidArgument(format!(
                "Unknown output format: {other} (expected json or table)"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_ingest_then_query() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("data.csv");
        fs::write(&source, "id,name\n1,ada\n").unwrap();
        let database = dir.path().join("warehouse.duckdb");

        let ingest = WarehouseIngestArgs {
            database: database.clone(),
            source,
            table: "people".to_string(),
        };
        assert!(handle_warehouse_ingest(&ingest).is_ok());

        let query = WarehouseQueryArgs {
            database,
            sql: "SELECT COUNT(*) AS n FROM people".to_string(),
            format: "json".to_string(),
        };
        assert!(handle_warehouse_query(&query).is_ok());
    }

    #[test]
    fn test_query_rejects_unknown_format() {
        let dir = TempDir::new().unwrap();
        let database = dir.path().join("warehouse.duckdb");

        let query = WarehouseQueryArgs {
            database,
            sql: "SELECT 1".to_string(),
            format: "csv".to_string(),
        };
        let err = handle_warehouse_query(&query).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
