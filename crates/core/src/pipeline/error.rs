//! Error types for pipeline operations
//!
//! Errors chain properly for debugging while providing user-friendly
//! messages for CLI output.

use std::path::PathBuf;
use thiserror::Error;

use crate::transform::TransformError;
use crate::warehouse::WarehouseError;

/// Errors that can occur during pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Stage execution failed with context
    #[error("Stage '{stage}' failed: {message}")]
    StageError { stage: String, message: String },

    /// Missing required input
    #[error("Missing required input: {0}")]
    MissingInput(String),

    /// Run state persistence error
    #[error("Run state error: {0}")]
    StateError(String),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Warehouse error (wrapped)
    #[error("Warehouse error: {0}")]
    Warehouse(String),

    /// Transformation error (wrapped)
    #[error("Transformation error: {0}")]
    Transform(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create a stage error with message
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StageError {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// Get the stage name if this is a stage error
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            PipelineError::StageError { stage, .. } => Some(stage),
            _ => None,
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::ConfigError(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check the pipeline arguments.")
            }
            PipelineError::StageError { stage, message } => {
                format!("Stage '{stage}' failed: {message}")
            }
            PipelineError::MissingInput(input) => {
                format!(
                    "Missing required input: {input}\n\nHint: Ensure all required files exist and paths are correct."
                )
            }
            PipelineError::FileNotFound(path) => {
                format!(
                    "File not found: {}\n\nHint: Check that the file exists and the path is correct.",
                    path.display()
                )
            }
            PipelineError::StateError(msg) => {
                format!("Run state error: {msg}\n\nHint: Remove the stale run state file and retry.")
            }
            _ => self.to_string(),
        }
    }
}

impl From<WarehouseError> for PipelineError {
    fn from(err: WarehouseError) -> Self {
        PipelineError::Warehouse(err.to_string())
    }
}

impl From<TransformError> for PipelineError {
    fn from(err: TransformError) -> Self {
        PipelineError::Transform(err.to_string())
    }
}
