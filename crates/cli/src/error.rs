//! CLI error types

use thiserror::Error;

/// Errors surfaced to the CLI user
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Pipeline operation failed
    #[error("Pipeline error: {0}")]
    PipelineError(String),

    /// Warehouse operation failed
    #[error("Warehouse error: {0}")]
    WarehouseError(String),

    /// Transformation operation failed
    #[error("Transform error: {0}")]
    TransformError(String),
}
