//! Transformation engine invocation
//!
//! The transform stage is a pure pass-through to an external rule-based
//! SQL transformation engine: given a project directory of declarative
//! `.sql` rule files and a connection profile pointing at the warehouse
//! database, the engine runs every rule in dependency order. Ordering and
//! rule semantics belong entirely to the engine; this module only builds
//! the configuration objects and spawns the executable.

mod config;
mod engine;
mod error;

pub use config::{ExecutionConfig, ProfileConfig, ProjectConfig, CONN_ID_VAR, ENGINE_HOME_VAR};
pub use engine::{ExecEngine, TransformEngine, TransformReport};
pub use error::TransformError;
