//! Pipeline orchestration
//!
//! Runs the two pipeline stages in order: ingest the source CSV into the
//! warehouse, then hand the warehouse to the external transformation
//! engine. Stages run strictly sequentially and the pipeline stops at the
//! first failure. Run state is persisted after every transition so an
//! external scheduler can observe progress.

mod config;
mod error;
mod executor;
mod state;

pub use config::{PipelineConfig, PipelineStage};
pub use error::{PipelineError, PipelineResult};
pub use executor::{PipelineExecutor, PipelineReport};
pub use state::{JsonRunStore, PipelineStatus, RunState, RunStore, StageOutput};
