//! CLI command implementations

pub mod pipeline;
pub mod transform;
pub mod warehouse;
