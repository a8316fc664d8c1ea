//! Configuration objects for the transformation stage
//!
//! Plain declarative structs mirroring what the external engine expects:
//! a project (directory of rule files), a connection profile (how to reach
//! the warehouse database), and an execution config (where the engine
//! executable lives).

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::TransformError;

/// Environment variable selecting the warehouse connection identifier
pub const CONN_ID_VAR: &str = "DUCKFLOW_CONN_ID";

/// Environment variable supplying the engine installation root
pub const ENGINE_HOME_VAR: &str = "DUCKFLOW_ENGINE_HOME";

const DEFAULT_CONN_ID: &str = "duckdb_default";
const ENGINE_BINARY: &str = "dbt";

/// A transformation project: a directory of declarative `.sql` rule files,
/// read-only to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project root directory
    pub dir: PathBuf,
}

impl ProjectConfig {
    /// Create a project config for the given directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Discover rule files (`**/*.sql`) under the project directory
    pub fn rule_files(&self) -> Result<Vec<PathBuf>, TransformError> {
        if !self.dir.is_dir() {
            return Err(TransformError::ProjectNotFound(self.dir.clone()));
        }

        let pattern = format!("{}/**/*.sql", self.dir.display());
        let entries = glob::glob(&pattern)
            .map_err(|e| TransformError::InvalidPattern(format!("{}: {}", pattern, e)))?;

        let mut files: Vec<PathBuf> = entries.filter_map(|p| p.ok()).collect();
        files.sort();
        Ok(files)
    }

    /// Check whether the project contains no rule files
    pub fn is_empty(&self) -> Result<bool, TransformError> {
        Ok(self.rule_files()?.is_empty())
    }
}

/// Connection profile describing how the engine reaches the warehouse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Profile name the project refers to
    pub profile_name: String,
    /// Target within the profile
    pub target_name: String,
    /// Connection identifier (from the environment)
    pub conn_id: String,
    /// Warehouse database file path
    pub database: PathBuf,
    /// Schema within the database
    pub schema: String,
}

impl ProfileConfig {
    /// Build a profile from environment configuration and static defaults
    ///
    /// `CONN_ID_VAR` selects the connection identifier; everything else
    /// falls back to the engine's conventional defaults.
    pub fn from_env(database: impl Into<PathBuf>) -> Self {
        Self {
            profile_name: "default".to_string(),
            target_name: "dev".to_string(),
            conn_id: env::var(CONN_ID_VAR).unwrap_or_else(|_| DEFAULT_CONN_ID.to_string()),
            database: database.into(),
            schema: "main".to_string(),
        }
    }

    /// Render the engine's `profiles.yml` document
    pub fn render_yaml(&self) -> Result<String, TransformError> {
        let output = ProfileOutput {
            kind: "duckdb".to_string(),
            path: self.database.display().to_string(),
            schema: self.schema.clone(),
            threads: 1,
        };

        let mut outputs = BTreeMap::new();
        outputs.insert(self.target_name.clone(), output);

        let body = ProfileBody {
            target: self.target_name.clone(),
            outputs,
        };

        let mut doc = BTreeMap::new();
        doc.insert(self.profile_name.clone(), body);

        Ok(serde_yaml::to_string(&doc)?)
    }

    /// Write `profiles.yml` into the given directory, creating it if needed
    pub fn write(&self, dir: &Path) -> Result<PathBuf, TransformError> {
        fs::create_dir_all(dir).map_err(|e| TransformError::ProfileWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;

        let path = dir.join("profiles.yml");
        let yaml = self.render_yaml()?;
        fs::write(&path, yaml).map_err(|e| TransformError::ProfileWrite {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }
}

#[derive(Debug, Serialize)]
struct ProfileBody {
    target: String,
    outputs: BTreeMap<String, ProfileOutput>,
}

#[derive(Debug, Serialize)]
struct ProfileOutput {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    schema: String,
    threads: u32,
}

/// Location of the transformation engine executable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Path to the engine executable
    pub executable: PathBuf,
}

impl ExecutionConfig {
    /// Create an execution config with an explicit executable path
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Locate the engine executable under `ENGINE_HOME_VAR`
    ///
    /// Resolves to `<home>/bin/dbt`.
    pub fn from_env() -> Result<Self, TransformError> {
        let home =
            env::var(ENGINE_HOME_VAR).map_err(|_| TransformError::EngineHomeNotSet(ENGINE_HOME_VAR))?;
        Ok(Self {
            executable: PathBuf::from(home).join("bin").join(ENGINE_BINARY),
        })
    }

    /// Check that the executable exists on disk
    pub fn check(&self) -> Result<(), TransformError> {
        if self.executable.is_file() {
            Ok(())
        } else {
            Err(TransformError::ExecutableNotFound(self.executable.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_rule_discovery() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("models")).unwrap();
        File::create(dir.path().join("models/daily.sql")).unwrap();
        File::create(dir.path().join("models/weekly.sql")).unwrap();
        File::create(dir.path().join("README.md")).unwrap();

        let project = ProjectConfig::new(dir.path());
        let rules = project.rule_files().unwrap();
        assert_eq!(rules.len(), 2);
        assert!(!project.is_empty().unwrap());
    }

    #[test]
    fn test_empty_project() {
        let dir = TempDir::new().unwrap();
        let project = ProjectConfig::new(dir.path());
        assert!(project.is_empty().unwrap());
    }

    #[test]
    fn test_missing_project_dir() {
        let dir = TempDir::new().unwrap();
        let project = ProjectConfig::new(dir.path().join("nope"));
        let err = project.rule_files().unwrap_err();
        assert!(matches!(err, TransformError::ProjectNotFound(_)));
    }

    #[test]
    fn test_profile_render_yaml() {
        let profile = ProfileConfig {
            profile_name: "default".to_string(),
            target_name: "dev".to_string(),
            conn_id: "duckdb_default".to_string(),
            database: PathBuf::from("/data/warehouse.duckdb"),
            schema: "main".to_string(),
        };

        let yaml = profile.render_yaml().unwrap();
        assert!(yaml.contains("default:"));
        assert!(yaml.contains("target: dev"));
        assert!(yaml.contains("type: duckdb"));
        assert!(yaml.contains("path: /data/warehouse.duckdb"));
        assert!(yaml.contains("schema: main"));
    }

    #[test]
    fn test_profile_write() {
        let dir = TempDir::new().unwrap();
        let profile = ProfileConfig::from_env("/data/warehouse.duckdb");

        let path = profile.write(&dir.path().join("profiles")).unwrap();
        assert!(path.ends_with("profiles.yml"));

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("type: duckdb"));
    }

    #[test]
    fn test_execution_config_check() {
        let dir = TempDir::new().unwrap();
        let missing = ExecutionConfig::new(dir.path().join("bin/dbt"));
        assert!(matches!(
            missing.check().unwrap_err(),
            TransformError::ExecutableNotFound(_)
        ));

        let exe = dir.path().join("dbt");
        let mut file = File::create(&exe).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        assert!(ExecutionConfig::new(&exe).check().is_ok());
    }
}
