//! Run state tracking and persistence
//!
//! Every run walks a fixed state machine: `Pending` before any stage
//! starts, `Ingesting` and `Transforming` while a stage runs, then a
//! terminal `Succeeded` or `Failed`. There are no retries and no backward
//! transitions; a failed run stays failed. The state is persisted through
//! a [`RunStore`] after every transition so external schedulers can
//! inspect progress.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::PipelineStage;
use super::error::{PipelineError, PipelineResult};

/// Pipeline run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    /// Run created, no stage started yet
    Pending,
    /// Ingest stage in progress
    Ingesting,
    /// Transform stage in progress
    Transforming,
    /// All stages completed
    Succeeded,
    /// A stage failed; terminal
    Failed,
}

impl PipelineStatus {
    /// Check whether the run has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ingesting => write!(f, "ingesting"),
            Self::Transforming => write!(f, "transforming"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// State of a single pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique pipeline run ID
    pub run_id: String,
    /// Pipeline name
    pub name: Option<String>,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the state was last updated
    pub updated_at: DateTime<Utc>,
    /// Current status
    pub status: PipelineStatus,
    /// Completed stages
    pub completed_stages: Vec<PipelineStage>,
    /// Stage outputs keyed by stage name
    pub stage_outputs: HashMap<String, StageOutput>,
    /// Error message if failed
    pub error: Option<String>,
    /// Configuration hash for change detection
    pub config_hash: String,
}

impl RunState {
    /// Create a new pending run
    pub fn new(run_id: impl Into<String>, config_hash: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: run_id.into(),
            name: None,
            started_at: now,
            updated_at: now,
            status: PipelineStatus::Pending,
            completed_stages: Vec::new(),
            stage_outputs: HashMap::new(),
            error: None,
            config_hash: config_hash.into(),
        }
    }

    /// Set pipeline name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Mark a stage as started, moving the run into that stage's status
    pub fn enter_stage(&mut self, stage: PipelineStage) {
        self.status = match stage {
            PipelineStage::Ingest => PipelineStatus::Ingesting,
            PipelineStage::Transform => PipelineStatus::Transforming,
        };
        self.updated_at = Utc::now();
    }

    /// Mark a stage as completed
    pub fn complete_stage(&mut self, stage: PipelineStage, output: StageOutput) {
        self.completed_stages.push(stage);
        self.stage_outputs.insert(stage.name().to_string(), output);
        self.updated_at = Utc::now();
    }

    /// Mark the run as succeeded
    pub fn complete(&mut self) {
        self.status = PipelineStatus::Succeeded;
        self.updated_at = Utc::now();
    }

    /// Mark the run as failed
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = PipelineStatus::Failed;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Check if a stage has been completed
    pub fn is_stage_completed(&self, stage: PipelineStage) -> bool {
        self.completed_stages.contains(&stage)
    }

    /// Get output from a completed stage
    pub fn get_stage_output(&self, stage: PipelineStage) -> Option<&StageOutput> {
        self.stage_outputs.get(stage.name())
    }

    /// Calculate duration so far
    pub fn duration(&self) -> chrono::Duration {
        self.updated_at - self.started_at
    }
}

/// Output from a pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    /// Whether the stage was successful
    pub success: bool,
    /// Whether the stage was skipped
    pub skipped: bool,
    /// Reason for skipping (if applicable)
    pub skip_reason: Option<String>,
    /// Output file paths
    pub files: Vec<PathBuf>,
    /// Stage-specific metadata
    pub metadata: HashMap<String, serde_json::Value>,
    /// Duration in milliseconds
    pub duration_ms: u64,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl StageOutput {
    /// Create a successful stage output
    pub fn success() -> Self {
        Self {
            success: true,
            skipped: false,
            skip_reason: None,
            files: Vec::new(),
            metadata: HashMap::new(),
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    /// Create a skipped stage output
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            skipped: true,
            skip_reason: Some(reason.into()),
            files: Vec::new(),
            metadata: HashMap::new(),
            duration_ms: 0,
            timestamp: Utc::now(),
        }
    }

    /// Add an output file
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Set duration
    pub fn with_duration(mut self, ms: u64) -> Self {
        self.duration_ms = ms;
        self
    }
}

/// Persistence for run state
///
/// The executor saves after every transition; schedulers load to inspect
/// progress. Tests substitute in-memory doubles.
pub trait RunStore {
    /// Persist the given run state
    fn save(&self, state: &RunState) -> PipelineResult<()>;

    /// Load the most recently saved run state, if any
    fn load(&self) -> PipelineResult<Option<RunState>>;
}

/// File-backed run store, one JSON document per database
#[derive(Debug, Clone)]
pub struct JsonRunStore {
    path: PathBuf,
}

impl JsonRunStore {
    /// Create a store at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store next to the warehouse database
    pub fn for_database(database: &Path) -> Self {
        let mut path = database.to_path_buf();
        path.set_extension("runstate.json");
        Self { path }
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RunStore for JsonRunStore {
    fn save(&self, state: &RunState) -> PipelineResult<()> {
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn load(&self) -> PipelineResult<Option<RunState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&self.path)?;
        let state: RunState = serde_json::from_str(&json)
            .map_err(|e| PipelineError::StateError(format!("{}: {}", self.path.display(), e)))?;
        Ok(Some(state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_run_state_new() {
        let state = RunState::new("run-123", "config-hash");
        assert_eq!(state.run_id, "run-123");
        assert_eq!(state.status, PipelineStatus::Pending);
        assert!(state.completed_stages.is_empty());
    }

    #[test]
    fn test_run_state_stage_lifecycle() {
        let mut state = RunState::new("run-123", "hash");

        state.enter_stage(PipelineStage::Ingest);
        assert_eq!(state.status, PipelineStatus::Ingesting);

        state.complete_stage(
            PipelineStage::Ingest,
            StageOutput::success().with_metadata("rows", serde_json::json!(374)),
        );
        assert!(state.is_stage_completed(PipelineStage::Ingest));

        state.enter_stage(PipelineStage::Transform);
        assert_eq!(state.status, PipelineStatus::Transforming);

        state.complete_stage(PipelineStage::Transform, StageOutput::success());
        state.complete();
        assert_eq!(state.status, PipelineStatus::Succeeded);
        assert!(state.status.is_terminal());
    }

    #[test]
    fn test_run_state_fail() {
        let mut state = RunState::new("run-123", "hash");
        state.enter_stage(PipelineStage::Ingest);
        state.fail("Source CSV missing");

        assert_eq!(state.status, PipelineStatus::Failed);
        assert!(state.status.is_terminal());
        assert_eq!(state.error, Some("Source CSV missing".to_string()));
    }

    #[test]
    fn test_skipped_stage_output() {
        let mut state = RunState::new("run-123", "hash");
        state.complete_stage(
            PipelineStage::Transform,
            StageOutput::skipped("no rule files in project"),
        );

        let output = state.get_stage_output(PipelineStage::Transform).unwrap();
        assert!(output.skipped);
        assert_eq!(
            output.skip_reason,
            Some("no rule files in project".to_string())
        );
    }

    #[test]
    fn test_stage_output() {
        let output = StageOutput::success()
            .with_file("/output/profiles.yml")
            .with_metadata("rules", serde_json::json!(4))
            .with_duration(1500);

        assert!(output.success);
        assert!(!output.skipped);
        assert_eq!(output.files.len(), 1);
        assert_eq!(output.duration_ms, 1500);
    }

    #[test]
    fn test_json_run_store_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonRunStore::for_database(&dir.path().join("warehouse.duckdb"));

        assert!(store.load().unwrap().is_none());

        let mut state = RunState::new("run-123", "hash").with_name("sleep_health");
        state.enter_stage(PipelineStage::Ingest);
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.run_id, "run-123");
        assert_eq!(loaded.name, Some("sleep_health".to_string()));
        assert_eq!(loaded.status, PipelineStatus::Ingesting);
    }

    #[test]
    fn test_json_run_store_path() {
        let store = JsonRunStore::for_database(Path::new("/data/warehouse.duckdb"));
        assert_eq!(store.path(), Path::new("/data/warehouse.runstate.json"));
    }
}
