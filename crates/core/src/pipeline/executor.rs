//! Pipeline executor for running the full ingest and transform pipeline

use std::path::PathBuf;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, info_span};
use uuid::Uuid;

use super::config::{PipelineConfig, PipelineStage};
use super::error::{PipelineError, PipelineResult};
use super::state::{JsonRunStore, PipelineStatus, RunState, RunStore, StageOutput};
use crate::transform::{ExecEngine, ExecutionConfig, ProfileConfig, TransformEngine};
use crate::warehouse::{CsvSource, Warehouse};

/// Directory (under the database parent) holding generated profiles
const PROFILES_DIR: &str = ".duckflow";

/// Pipeline executor that runs all stages in order
pub struct PipelineExecutor {
    config: PipelineConfig,
    state: RunState,
    engine: Option<Box<dyn TransformEngine>>,
    store: Box<dyn RunStore>,
}

impl PipelineExecutor {
    /// Create a new pipeline executor with default engine and store
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        let store = Box::new(JsonRunStore::for_database(&config.database));
        Self::with_parts(config, None, store)
    }

    /// Create an executor with an injected engine and store
    pub fn with_parts(
        config: PipelineConfig,
        engine: Option<Box<dyn TransformEngine>>,
        store: Box<dyn RunStore>,
    ) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::ConfigError)?;

        let config_hash = Self::hash_config(&config);
        let run_id = Uuid::new_v4().to_string();

        let mut state = RunState::new(run_id, config_hash);
        if let Some(ref name) = config.name {
            state = state.with_name(name.clone());
        }

        Ok(Self {
            config,
            state,
            engine,
            store,
        })
    }

    /// Get the current run state
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run the pipeline
    pub fn run(&mut self) -> PipelineResult<PipelineReport> {
        let _span = info_span!(
            "pipeline_run",
            run_id = %self.state.run_id,
            dry_run = self.config.dry_run
        )
        .entered();

        let start = Instant::now();
        let stages = self.config.effective_stages();

        info!(
            run_id = %self.state.run_id,
            stages = ?stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            dry_run = self.config.dry_run,
            "Starting pipeline"
        );

        if self.config.verbose {
            eprintln!("Pipeline run: {}", self.state.run_id);
            eprintln!(
                "Stages to run: {:?}",
                stages.iter().map(|s| s.name()).collect::<Vec<_>>()
            );
            if self.config.dry_run {
                eprintln!("DRY RUN MODE - no changes will be made");
            }
        }

        // Validate inputs only in dry-run mode
        if self.config.dry_run {
            return self.dry_run(&stages);
        }

        self.store.save(&self.state)?;

        for stage in &stages {
            let _stage_span = info_span!("pipeline_stage", stage = stage.name()).entered();
            info!(stage = stage.name(), "Starting stage");

            if self.config.verbose {
                eprintln!("Running stage {}...", stage.name());
            }

            self.state.enter_stage(*stage);
            self.store.save(&self.state)?;

            match self.run_stage(*stage) {
                Ok(output) => {
                    info!(
                        stage = stage.name(),
                        duration_ms = output.duration_ms,
                        skipped = output.skipped,
                        "Stage completed"
                    );
                    if self.config.verbose {
                        eprintln!(
                            "Stage {} completed in {}ms",
                            stage.name(),
                            output.duration_ms
                        );
                    }
                    self.state.complete_stage(*stage, output);
                    self.store.save(&self.state)?;
                }
                Err(e) => {
                    let err = PipelineError::stage(stage.name(), e.to_string());
                    error!(stage = stage.name(), error = %e, "Stage failed");
                    eprintln!("Stage {} failed: {}", stage.name(), e);
                    self.state.fail(err.to_string());
                    self.store.save(&self.state)?;
                    return Err(err);
                }
            }
        }

        self.state.complete();
        self.store.save(&self.state)?;

        let duration = start.elapsed();
        info!(
            run_id = %self.state.run_id,
            duration_ms = duration.as_millis() as u64,
            stages_completed = self.state.completed_stages.len(),
            "Pipeline completed"
        );

        Ok(PipelineReport {
            run_id: self.state.run_id.clone(),
            status: self.state.status,
            stages_completed: self.state.completed_stages.clone(),
            duration_ms: duration.as_millis() as u64,
            outputs: self.state.stage_outputs.clone(),
        })
    }

    /// Run a single stage
    fn run_stage(&self, stage: PipelineStage) -> PipelineResult<StageOutput> {
        let start = Instant::now();

        let output = match stage {
            PipelineStage::Ingest => self.run_ingest()?,
            PipelineStage::Transform => self.run_transform()?,
        };

        Ok(output.with_duration(start.elapsed().as_millis() as u64))
    }

    /// Run the ingest stage
    ///
    /// The warehouse connection is scoped to this stage: it is dropped
    /// before the transformation engine opens the same database file.
    fn run_ingest(&self) -> PipelineResult<StageOutput> {
        let source_path = self
            .config
            .source
            .as_ref()
            .ok_or_else(|| PipelineError::MissingInput("source CSV path".to_string()))?;

        debug!(
            source = %source_path.display(),
            table = %self.config.table,
            "Starting ingestion"
        );

        let source = CsvSource::new(source_path);
        let db = Warehouse::open(&self.config.database.to_string_lossy())?;
        let report = db.ingest_csv(&self.config.table, &source)?;

        // Loaded table must line up with the file it came from
        let summary = source.probe()?;
        db.assert_matches_source(&self.config.table, &summary)?;

        if self.config.verbose {
            if report.skipped {
                eprintln!(
                    "  Table {} already loaded ({} rows)",
                    report.table, report.rows
                );
            } else {
                eprintln!(
                    "  Loaded {} rows into {} ({} columns)",
                    report.rows, report.table, report.columns
                );
            }
        }

        Ok(StageOutput::success()
            .with_metadata("source", serde_json::json!(source_path.display().to_string()))
            .with_metadata("table", serde_json::json!(report.table))
            .with_metadata("rows", serde_json::json!(report.rows))
            .with_metadata("columns", serde_json::json!(report.columns))
            .with_metadata("load_skipped", serde_json::json!(report.skipped)))
    }

    /// Run the transform stage
    fn run_transform(&self) -> PipelineResult<StageOutput> {
        let project = self
            .config
            .project
            .as_ref()
            .ok_or_else(|| PipelineError::MissingInput("project directory".to_string()))?;

        if project.is_empty()? {
            debug!(project = %project.dir.display(), "No rule files in project, skipping");
            return Ok(StageOutput::skipped("no rule files in project"));
        }

        let profile = match self.config.profile {
            Some(ref profile) => profile.clone(),
            None => ProfileConfig::from_env(&self.config.database),
        };

        let profiles_dir = self
            .config
            .database
            .parent()
            .map(|p| p.join(PROFILES_DIR))
            .unwrap_or_else(|| PathBuf::from(PROFILES_DIR));
        let profile_path = profile.write(&profiles_dir)?;

        debug!(
            project = %project.dir.display(),
            profile = %profile_path.display(),
            conn_id = %profile.conn_id,
            "Starting transformation"
        );

        let report = match self.engine {
            Some(ref engine) => engine.run(project, &profiles_dir)?,
            None => {
                let execution = match self.config.execution {
                    Some(ref execution) => execution.clone(),
                    None => ExecutionConfig::from_env()?,
                };
                execution.check()?;
                ExecEngine::new(execution).run(project, &profiles_dir)?
            }
        };

        if self.config.verbose {
            eprintln!("  Ran {} transformation rules", report.rules);
        }

        Ok(StageOutput::success()
            .with_file(&profile_path)
            .with_metadata("rules", serde_json::json!(report.rules))
            .with_metadata("conn_id", serde_json::json!(profile.conn_id)))
    }

    /// Run in dry-run mode (validation only)
    fn dry_run(&self, stages: &[PipelineStage]) -> PipelineResult<PipelineReport> {
        let mut validation_errors = Vec::new();

        for stage in stages {
            if let Err(e) = self.validate_stage(*stage) {
                validation_errors.push(format!("{}: {}", stage.name(), e));
            }
        }

        if !validation_errors.is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "Validation errors:\n  {}",
                validation_errors.join("\n  ")
            )));
        }

        eprintln!("Dry run validation passed for all stages");

        Ok(PipelineReport {
            run_id: self.state.run_id.clone(),
            status: PipelineStatus::Succeeded,
            stages_completed: Vec::new(),
            duration_ms: 0,
            outputs: std::collections::HashMap::new(),
        })
    }

    /// Validate a stage's inputs
    fn validate_stage(&self, stage: PipelineStage) -> PipelineResult<()> {
        match stage {
            PipelineStage::Ingest => {
                let source = self
                    .config
                    .source
                    .as_ref()
                    .ok_or_else(|| PipelineError::MissingInput("source CSV path".to_string()))?;
                if !source.exists() {
                    return Err(PipelineError::FileNotFound(source.clone()));
                }
            }
            PipelineStage::Transform => {
                let project = self
                    .config
                    .project
                    .as_ref()
                    .ok_or_else(|| PipelineError::MissingInput("project directory".to_string()))?;
                if !project.dir.is_dir() {
                    return Err(PipelineError::FileNotFound(project.dir.clone()));
                }
                match self.config.execution {
                    Some(ref execution) => execution.check()?,
                    None => ExecutionConfig::from_env()?.check()?,
                }
            }
        }
        Ok(())
    }

    /// Hash the config for change detection
    fn hash_config(config: &PipelineConfig) -> String {
        let mut hasher = Sha256::new();
        hasher.update(config.database.display().to_string().as_bytes());
        if let Some(ref source) = config.source {
            hasher.update(source.display().to_string().as_bytes());
        }
        hasher.update(config.table.as_bytes());
        if let Some(ref project) = config.project {
            hasher.update(project.dir.display().to_string().as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}

/// Report from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// Run ID
    pub run_id: String,
    /// Final status
    pub status: PipelineStatus,
    /// Completed stages
    pub stages_completed: Vec<PipelineStage>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
    /// Stage outputs
    pub outputs: std::collections::HashMap<String, StageOutput>,
}

impl PipelineReport {
    /// Check if pipeline was successful
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Succeeded
    }

    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else {
            format!("{}s", secs)
        }
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("Pipeline {} - {}", self.run_id, self.status);
        eprintln!("Duration: {}", self.duration_formatted());
        eprintln!("Stages completed: {}", self.stages_completed.len());

        for stage in &self.stages_completed {
            if let Some(output) = self.outputs.get(stage.name()) {
                let status = if output.skipped {
                    "skipped"
                } else if output.success {
                    "ok"
                } else {
                    "failed"
                };
                eprintln!(
                    "  - {}: {} ({}ms)",
                    stage.name(),
                    status,
                    output.duration_ms
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pipeline_executor_creation() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("input.csv");
        std::fs::write(&source, "id\n1\n").unwrap();

        let config = PipelineConfig::new()
            .with_source(&source)
            .with_database(temp.path().join("warehouse.duckdb"))
            .with_stages(vec![PipelineStage::Ingest]);

        let executor = PipelineExecutor::new(config).unwrap();
        assert_eq!(executor.state().status, PipelineStatus::Pending);
    }

    #[test]
    fn test_config_hash() {
        let config1 = PipelineConfig::new()
            .with_source("/data/input.csv")
            .with_table("readings");

        let config2 = PipelineConfig::new()
            .with_source("/data/input.csv")
            .with_table("readings");

        let config3 = PipelineConfig::new()
            .with_source("/data/other.csv")
            .with_table("readings");

        assert_eq!(
            PipelineExecutor::hash_config(&config1),
            PipelineExecutor::hash_config(&config2)
        );
        assert_ne!(
            PipelineExecutor::hash_config(&config1),
            PipelineExecutor::hash_config(&config3)
        );
    }

    #[test]
    fn test_pipeline_report() {
        let report = PipelineReport {
            run_id: "test-123".to_string(),
            status: PipelineStatus::Succeeded,
            stages_completed: vec![PipelineStage::Ingest, PipelineStage::Transform],
            duration_ms: 65000,
            outputs: std::collections::HashMap::new(),
        };

        assert!(report.is_success());
        assert_eq!(report.duration_formatted(), "1m 5s");
    }

    #[test]
    fn test_dry_run_checks_env_engine_executable() {
        use crate::transform::{ProjectConfig, ENGINE_HOME_VAR};

        let temp = TempDir::new().unwrap();
        let source = temp.path().join("input.csv");
        std::fs::write(&source, "id\n1\n").unwrap();
        let project_dir = temp.path().join("project");
        std::fs::create_dir(&project_dir).unwrap();

        // Engine home with no bin/dbt underneath it
        unsafe { std::env::set_var(ENGINE_HOME_VAR, temp.path()) };

        let config = PipelineConfig::new()
            .with_source(&source)
            .with_database(temp.path().join("warehouse.duckdb"))
            .with_project(ProjectConfig::new(&project_dir))
            .with_dry_run(true);

        let mut executor = PipelineExecutor::new(config).unwrap();
        let err = executor.run().unwrap_err();
        assert!(err.to_string().contains("transform"));

        unsafe { std::env::remove_var(ENGINE_HOME_VAR) };
    }

    #[test]
    fn test_dry_run_missing_source() {
        let temp = TempDir::new().unwrap();

        let config = PipelineConfig::new()
            .with_source(temp.path().join("missing.csv"))
            .with_database(temp.path().join("warehouse.duckdb"))
            .with_stages(vec![PipelineStage::Ingest])
            .with_dry_run(true);

        let mut executor = PipelineExecutor::new(config).unwrap();
        let err = executor.run().unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }
}
