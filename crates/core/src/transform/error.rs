//! Error types for transformation operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while invoking the transformation engine
#[derive(Error, Debug)]
pub enum TransformError {
    /// Project directory does not exist
    #[error("Transformation project not found: {0}")]
    ProjectNotFound(PathBuf),

    /// Engine executable does not exist
    #[error("Transformation engine executable not found: {0}")]
    ExecutableNotFound(PathBuf),

    /// Environment variable locating the engine installation is missing
    #[error("Environment variable {0} is not set")]
    EngineHomeNotSet(&'static str),

    /// Engine exited with a failure
    #[error("Transformation engine failed (exit code {code:?}): {stderr}")]
    EngineFailed { code: Option<i32>, stderr: String },

    /// Failed to write the connection profile
    #[error("Failed to write profile to {path}: {source}")]
    ProfileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid rule discovery pattern
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl TransformError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            TransformError::ProjectNotFound(path) => {
                format!(
                    "Transformation project not found: {}\n\nHint: Check the --project-dir path.",
                    path.display()
                )
            }
            TransformError::ExecutableNotFound(path) => {
                format!(
                    "Transformation engine executable not found: {}\n\n\
                    Hint: Set {} to the engine installation root or pass --executable.",
                    path.display(),
                    super::ENGINE_HOME_VAR
                )
            }
            TransformError::EngineHomeNotSet(var) => {
                format!(
                    "Environment variable {var} is not set.\n\n\
                    Hint: Export {var} or pass --executable with the engine binary path."
                )
            }
            TransformError::EngineFailed { code, stderr } => {
                format!(
                    "Transformation engine failed (exit code {code:?}).\n\n{stderr}"
                )
            }
            _ => self.to_string(),
        }
    }
}
