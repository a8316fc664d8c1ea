//! Pipeline configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::transform::{ExecutionConfig, ProfileConfig, ProjectConfig};

/// Main pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Name of the pipeline run
    pub name: Option<String>,
    /// Warehouse database path
    pub database: PathBuf,
    /// Source CSV file for ingestion
    pub source: Option<PathBuf>,
    /// Target table name for ingestion
    pub table: String,
    /// Transformation project (required for the transform stage)
    pub project: Option<ProjectConfig>,
    /// Connection profile override (derived from the environment if absent)
    pub profile: Option<ProfileConfig>,
    /// Engine execution override (derived from the environment if absent)
    pub execution: Option<ExecutionConfig>,
    /// Stages to run (empty = all)
    pub stages: Vec<PipelineStage>,
    /// Enable dry-run mode
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: None,
            database: PathBuf::from("warehouse.duckdb"),
            source: None,
            table: "raw_data".to_string(),
            project: None,
            profile: None,
            execution: None,
            stages: Vec::new(),
            dry_run: false,
            verbose: false,
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pipeline name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the database path
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = path.into();
        self
    }

    /// Set the source CSV path
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Set the target table name
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Set the transformation project
    pub fn with_project(mut self, project: ProjectConfig) -> Self {
        self.project = Some(project);
        self
    }

    /// Set an explicit connection profile
    pub fn with_profile(mut self, profile: ProfileConfig) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Set an explicit engine execution config
    pub fn with_execution(mut self, execution: ExecutionConfig) -> Self {
        self.execution = Some(execution);
        self
    }

    /// Set specific stages to run
    pub fn with_stages(mut self, stages: Vec<PipelineStage>) -> Self {
        self.stages = stages;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Get stages to run (all if empty)
    pub fn effective_stages(&self) -> Vec<PipelineStage> {
        if self.stages.is_empty() {
            PipelineStage::all()
        } else {
            self.stages.clone()
        }
    }

    /// Check if a specific stage should run
    pub fn should_run_stage(&self, stage: PipelineStage) -> bool {
        if self.stages.is_empty() {
            true
        } else {
            self.stages.contains(&stage)
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // Source is required for ingest stage
        if self.should_run_stage(PipelineStage::Ingest) && self.source.is_none() {
            return Err("Source CSV path is required for ingest stage".to_string());
        }

        // Project is required for transform stage
        if self.should_run_stage(PipelineStage::Transform) && self.project.is_none() {
            return Err("Project directory is required for transform stage".to_string());
        }

        // Both stages must see the same database file
        if let Some(ref profile) = self.profile {
            if profile.database != self.database {
                return Err(format!(
                    "Profile database {} does not match pipeline database {}",
                    profile.database.display(),
                    self.database.display()
                ));
            }
        }

        Ok(())
    }
}

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Stage 1: Load the source CSV into the warehouse
    Ingest,
    /// Stage 2: Run the transformation engine against the warehouse
    Transform,
}

impl PipelineStage {
    /// Get all stages in execution order
    pub fn all() -> Vec<Self> {
        vec![Self::Ingest, Self::Transform]
    }

    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ingest => "ingest",
            Self::Transform => "transform",
        }
    }

    /// Get stage description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ingest => "Load source CSV into the warehouse",
            Self::Transform => "Run transformation rules against the warehouse",
        }
    }

    /// Get stage index (1-based)
    pub fn index(&self) -> usize {
        match self {
            Self::Ingest => 1,
            Self::Transform => 2,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for PipelineStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ingest" | "1" => Ok(Self::Ingest),
            "transform" | "2" => Ok(Self::Transform),
            _ => Err(format!("Unknown stage: {}", s)),
        }
    }
}
