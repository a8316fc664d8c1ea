//! Transformation engine invocation

use std::path::Path;
use std::process::Command;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::config::{ExecutionConfig, ProjectConfig};
use super::error::TransformError;

/// Report from a transformation engine run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformReport {
    /// Number of rule files in the project
    pub rules: usize,
    /// Captured standard output of the engine
    pub stdout: String,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// External transformation engine
///
/// The pipeline never inspects rule ordering or semantics; implementations
/// hand the whole project to the engine and report the outcome. Tests
/// substitute recording or failing doubles.
pub trait TransformEngine {
    /// Run all transformations in the project against the profiled database
    fn run(
        &self,
        project: &ProjectConfig,
        profiles_dir: &Path,
    ) -> Result<TransformReport, TransformError>;
}

/// Engine implementation that spawns the external executable
pub struct ExecEngine {
    execution: ExecutionConfig,
}

impl ExecEngine {
    /// Create an engine around the given execution config
    pub fn new(execution: ExecutionConfig) -> Self {
        Self { execution }
    }
}

impl TransformEngine for ExecEngine {
    fn run(
        &self,
        project: &ProjectConfig,
        profiles_dir: &Path,
    ) -> Result<TransformReport, TransformError> {
        let start = Instant::now();
        let rules = project.rule_files()?;

        debug!(
            executable = %self.execution.executable.display(),
            project = %project.dir.display(),
            rules = rules.len(),
            "Invoking transformation engine"
        );

        let output = Command::new(&self.execution.executable)
            .arg("run")
            .arg("--project-dir")
            .arg(&project.dir)
            .arg("--profiles-dir")
            .arg(profiles_dir)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    TransformError::ExecutableNotFound(self.execution.executable.clone())
                }
                _ => TransformError::Io(e),
            })?;

        if !output.status.success() {
            return Err(TransformError::EngineFailed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(rules = rules.len(), duration_ms, "Transformation engine completed");

        Ok(TransformReport {
            rules: rules.len(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            duration_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn project_with_rule(dir: &TempDir) -> ProjectConfig {
        let project_dir = dir.path().join("project");
        fs::create_dir(&project_dir).unwrap();
        File::create(project_dir.join("model.sql")).unwrap();
        ProjectConfig::new(project_dir)
    }

    #[cfg(unix)]
    fn write_script(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{}", body).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_missing_executable() {
        let dir = TempDir::new().unwrap();
        let project = project_with_rule(&dir);

        let engine = ExecEngine::new(ExecutionConfig::new(dir.path().join("no-such-engine")));
        let err = engine.run(&project, dir.path()).unwrap_err();
        assert!(matches!(err, TransformError::ExecutableNotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_run() {
        let dir = TempDir::new().unwrap();
        let project = project_with_rule(&dir);
        let exe = write_script(&dir, "engine", "echo done");

        let engine = ExecEngine::new(ExecutionConfig::new(exe));
        let report = engine.run(&project, dir.path()).unwrap();
        assert_eq!(report.rules, 1);
        assert!(report.stdout.contains("done"));
    }

    #[cfg(unix)]
    #[test]
    fn test_engine_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let project = project_with_rule(&dir);
        let exe = write_script(&dir, "engine", "echo broken rule >&2; exit 2");

        let engine = ExecEngine::new(ExecutionConfig::new(exe));
        let err = engine.run(&project, dir.path()).unwrap_err();
        match err {
            TransformError::EngineFailed { code, stderr } => {
                assert_eq!(code, Some(2));
                assert!(stderr.contains("broken rule"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
