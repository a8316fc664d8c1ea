//! CLI commands for standalone transformation runs

use std::path::PathBuf;

use crate::error::CliError;
use duckflow_core::transform::{
    ExecEngine, ExecutionConfig, ProfileConfig, ProjectConfig, TransformEngine,
};

/// Arguments for the `transform run` command
pub struct TransformRunArgs {
    /// Path to the warehouse database file
    pub database: PathBuf,
    /// Transformation project directory
    pub project_dir: PathBuf,
    /// Directory to write the connection profile into
    pub profiles_dir: PathBuf,
    /// Engine executable override
    pub executable: Option<PathBuf>,
}

/// Arguments for the `transform list` command
pub struct TransformListArgs {
    /// Transformation project directory
    pub project_dir: PathBuf,
}

/// Handle the `transform run` command
pub fn handle_transform_run(args: &TransformRunArgs) -> Result<(), CliError> {
    let project = ProjectConfig::new(&args.project_dir);

    let execution = match args.executable {
        Some(ref executable) => ExecutionConfig::new(executable),
        None => ExecutionConfig::from_env().map_err(|e| CliError::TransformError(e.user_message()))?,
    };
    execution
        .check()
        .map_err(|e| CliError::TransformError(e.user_message()))?;

    let profile = ProfileConfig::from_env(&args.database);
    let profile_path = profile
        .write(&args.profiles_dir)
        .map_err(|e| CliError::TransformError(e.user_message()))?;

    println!("Project:  {}", args.project_dir.display());
    println!("Profile:  {}", profile_path.display());
    println!("Database: {}", args.database.display());

    let report = ExecEngine::new(execution)
        .run(&project, &args.profiles_dir)
        .map_err(|e| CliError::TransformError(e.user_message()))?;

    println!();
    println!("Transformation complete:");
    println!("  Rules:    {}", report.rules);
    println!("  Duration: {}ms", report.duration_ms);

    Ok(())
}

/// Handle the `transform list` command
pub fn handle_transform_list(args: &TransformListArgs) -> Result<(), CliError> {
    let project = ProjectConfig::new(&args.project_dir);
    let rules = project
        .rule_files()
        .map_err(|e| CliError::TransformError(e.user_message()))?;

    if rules.is_empty() {
        println!("No rule files in {}", args.project_dir.display());
        return Ok(());
    }

    println!("Rule files in {}:", args.project_dir.display());
    for rule in &rules {
        let rel = rule.strip_prefix(&args.project_dir).unwrap_or(rule);
        println!("  {}", rel.display());
    }
    println!();
    println!("{} rules", rules.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_transform_list() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("daily.sql"), "SELECT 1").unwrap();

        let args = TransformListArgs {
            project_dir: dir.path().to_path_buf(),
        };
        assert!(handle_transform_list(&args).is_ok());
    }

    #[test]
    fn test_transform_list_missing_project() {
        let dir = TempDir::new().unwrap();
        let args = TransformListArgs {
            project_dir: dir.path().join("nope"),
        };
        let err = handle_transform_list(&args).unwrap_err();
        assert!(matches!(err, CliError::TransformError(_)));
    }
}
