//! Duckflow CLI - CSV ingestion and SQL transformation pipeline

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;

use commands::pipeline::{
    handle_pipeline_run, handle_pipeline_status, PipelineRunArgs, PipelineStatusArgs,
};
use commands::transform::{
    handle_transform_list, handle_transform_run, TransformListArgs, TransformRunArgs,
};
use commands::warehouse::{
    handle_warehouse_ingest, handle_warehouse_query, WarehouseIngestArgs, WarehouseQueryArgs,
};

#[derive(Parser)]
#[command(name = "duckflow", version, about = "CSV-to-DuckDB ingestion and SQL transformation pipeline")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline (ingest then transform)
    Run {
        /// Path to the warehouse database file
        #[arg(long, default_value = "warehouse.duckdb")]
        database: PathBuf,
        /// Source CSV file to ingest
        #[arg(long)]
        source: Option<PathBuf>,
        /// Target table name
        #[arg(long, default_value = "raw_data")]
        table: String,
        /// Transformation project directory
        #[arg(long)]
        project_dir: Option<PathBuf>,
        /// Engine executable (defaults to DUCKFLOW_ENGINE_HOME/bin/dbt)
        #[arg(long)]
        executable: Option<PathBuf>,
        /// Pipeline name
        #[arg(long)]
        name: Option<String>,
        /// Stages to run (ingest, transform; default all)
        #[arg(long)]
        stage: Vec<String>,
        /// Validate inputs without running
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the state of the last pipeline run
    Status {
        /// Path to the warehouse database file
        #[arg(long, default_value = "warehouse.duckdb")]
        database: PathBuf,
    },
    /// Load a CSV file into the warehouse
    Ingest {
        /// Path to the warehouse database file
        #[arg(long, default_value = "warehouse.duckdb")]
        database: PathBuf,
        /// Source CSV file to ingest
        source: PathBuf,
        /// Target table name
        #[arg(long, default_value = "raw_data")]
        table: String,
    },
    /// Execute a SQL query against the warehouse
    Query {
        /// Path to the warehouse database file
        #[arg(long, default_value = "warehouse.duckdb")]
        database: PathBuf,
        /// SQL query to execute
        sql: String,
        /// Output format (json, table)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Run or inspect the transformation project on its own
    Transform {
        #[command(subcommand)]
        command: TransformCommand,
    },
}

#[derive(Subcommand)]
enum TransformCommand {
    /// Run the transformation engine against the warehouse
    Run {
        /// Path to the warehouse database file
        #[arg(long, default_value = "warehouse.duckdb")]
        database: PathBuf,
        /// Transformation project directory
        #[arg(long)]
        project_dir: PathBuf,
        /// Directory to write the connection profile into
        #[arg(long, default_value = ".duckflow")]
        profiles_dir: PathBuf,
        /// Engine executable (defaults to DUCKFLOW_ENGINE_HOME/bin/dbt)
        #[arg(long)]
        executable: Option<PathBuf>,
    },
    /// List rule files in a transformation project
    List {
        /// Transformation project directory
        #[arg(long)]
        project_dir: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("duckflow={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Run {
            database,
            source,
            table,
            project_dir,
            executable,
            name,
            stage,
            dry_run,
        } => handle_pipeline_run(&PipelineRunArgs {
            name,
            database,
            source,
            table,
            project_dir,
            executable,
            stages: stage,
            dry_run,
            verbose: cli.verbose,
        }),
        Command::Status { database } => handle_pipeline_status(&PipelineStatusArgs { database }),
        Command::Ingest {
            database,
            source,
            table,
        } => handle_warehouse_ingest(&WarehouseIngestArgs {
            database,
            source,
            table,
        }),
        Command::Query {
            database,
            sql,
            format,
        } => handle_warehouse_query(&WarehouseQueryArgs {
            database,
            sql,
            format,
        }),
        Command::Transform { command } => match command {
            TransformCommand::Run {
                database,
                project_dir,
                profiles_dir,
                executable,
            } => handle_transform_run(&TransformRunArgs {
                database,
                project_dir,
                profiles_dir,
                executable,
            }),
            TransformCommand::List { project_dir } => {
                handle_transform_list(&TransformListArgs { project_dir })
            }
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
