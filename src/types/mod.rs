//! Core Types
//!
//! Data contracts shared across the crate: error taxonomy, stage and run
//! records, and the retrieval fragment/hit shapes.

pub mod error;
pub mod fragment;
pub mod stage;

pub use error::{PlanError, Result};
pub use fragment::{Fragment, RetrievalHit};
pub use stage::{PipelineRun, RunStatus, Stage, StageOutput, TaskRequest};
