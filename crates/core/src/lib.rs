//! Duckflow Core - CSV-to-DuckDB ingestion and SQL transformation pipeline
//!
//! Provides the building blocks for a two-stage data pipeline:
//! - Warehouse operations (loading delimited files into an embedded DuckDB database)
//! - Transformation engine invocation (dbt-style projects of declarative SQL rules)
//! - Pipeline orchestration with persisted run state

pub mod pipeline;
pub mod transform;
pub mod warehouse;

// Re-export commonly used types
pub use pipeline::{
    PipelineConfig, PipelineError, PipelineExecutor, PipelineReport, PipelineStage,
    PipelineStatus, RunState, RunStore, StageOutput,
};
pub use transform::{
    ExecEngine, ExecutionConfig, ProfileConfig, ProjectConfig, TransformEngine, TransformError,
    TransformReport,
};
pub use warehouse::{CsvSource, CsvSummary, IngestReport, Warehouse, WarehouseError};
