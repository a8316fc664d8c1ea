//! CLI commands for pipeline operations

use std::path::PathBuf;

use crate::error::CliError;
use duckflow_core::pipeline::{JsonRunStore, PipelineConfig, PipelineExecutor, PipelineStage, RunStore};
use duckflow_core::transform::{ExecutionConfig, ProjectConfig};

/// Arguments for the `pipeline run` command
pub struct PipelineRunArgs {
    /// Pipeline name
    pub name: Option<String>,
    /// Path to the warehouse database file
    pub database: PathBuf,
    /// Source CSV file to ingest
    pub source: Option<PathBuf>,
    /// Target table name
    pub table: String,
    /// Transformation project directory
    pub project_dir: Option<PathBuf>,
    /// Engine executable override
    pub executable: Option<PathBuf>,
    /// Stages to run (empty = all)
    pub stages: Vec<String>,
    /// Dry run mode
    pub dry_run: bool,
    /// Verbose output
    pub verbose: bool,
}

/// Arguments for the `pipeline status` command
pub struct PipelineStatusArgs {
    /// Path to the warehouse database file
    pub database: PathBuf,
}

/// Handle the `pipeline run` command
pub fn handle_pipeline_run(args: &PipelineRunArgs) -> Result<(), CliError> {
    // Parse stages
    let stages: Vec<PipelineStage> = if args.stages.is_empty() {
        Vec::new() // Empty means all stages
    } else {
        args.stages
            .iter()
            .map(|s| s.parse::<PipelineStage>().map_err(CliError::InvalidArgument))
            .collect::<Result<Vec<_>, _>>()?
    };

    // Build config
    let mut config = PipelineConfig::new()
        .with_database(&args.database)
        .with_table(&args.table)
        .with_stages(stages)
        .with_dry_run(args.dry_run)
        .with_verbose(args.verbose);

    if let Some(ref name) = args.name {
        config = config.with_name(name);
    }

    if let Some(ref source) = args.source {
        config = config.with_source(source);
    }

    if let Some(ref project_dir) = args.project_dir {
        config = config.with_project(ProjectConfig::new(project_dir));
    }

    if let Some(ref executable) = args.executable {
        config = config.with_execution(ExecutionConfig::new(executable));
    }

    // Create executor
    let mut executor =
        PipelineExecutor::new(config).map_err(|e| CliError::PipelineError(e.user_message()))?;

    eprintln!("Starting pipeline run: {}", executor.state().run_id);

    // Run pipeline
    let report = executor
        .run()
        .map_err(|e| CliError::PipelineError(e.user_message()))?;

    // Print summary
    report.print_summary();

    if report.is_success() {
        eprintln!();
        eprintln!("Pipeline completed successfully!");
        Ok(())
    } else {
        Err(CliError::PipelineError("Pipeline failed".to_string()))
    }
}

/// Handle the `pipeline status` command
pub fn handle_pipeline_status(args: &PipelineStatusArgs) -> Result<(), CliError> {
    let store = JsonRunStore::for_database(&args.database);

    let state = match store
        .load()
        .map_err(|e| CliError::PipelineError(format!("Failed to load run state: {}", e)))?
    {
        Some(state) => state,
        None => {
            eprintln!(
                "No pipeline run state found for database: {}",
                args.database.display()
            );
            eprintln!("Run 'duckflow pipeline run' to start a new pipeline.");
            return Ok(());
        }
    };

    eprintln!("Pipeline Status");
    eprintln!("===============");
    eprintln!();
    eprintln!("Run ID:   {}", state.run_id);
    if let Some(ref name) = state.name {
        eprintln!("Name:     {}", name);
    }
    eprintln!("Status:   {}", state.status);
    eprintln!(
        "Started:  {}",
        state.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    eprintln!(
        "Updated:  {}",
        state.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    eprintln!();
    eprintln!("Completed Stages:");
    for stage in &state.completed_stages {
        if let Some(output) = state.stage_outputs.get(stage.name()) {
            let status = if output.skipped {
                "skipped"
            } else if output.success {
                "completed"
            } else {
                "failed"
            };
            eprintln!(
                "  - {}: {} ({}ms)",
                stage.name(),
                status,
                output.duration_ms
            );
        } else {
            eprintln!("  - {}: completed", stage.name());
        }
    }

    if let Some(ref error) = state.error {
        eprintln!();
        eprintln!("Error: {}", error);
    }

    Ok(())
}
