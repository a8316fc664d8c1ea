//! Warehouse operations against the embedded DuckDB database
//!
//! The warehouse is the working store shared by both pipeline stages: the
//! ingest stage materializes a CSV file as a table here, and the external
//! transformation engine reads and derives tables from it afterwards.

mod db;
mod error;
mod source;

pub use db::{IngestReport, Warehouse};
pub use error::WarehouseError;
pub use source::{CsvSource, CsvSummary};
