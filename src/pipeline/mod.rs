//! Plan Generation Pipeline
//!
//! Sequential research -> plan -> review orchestration with progress
//! reporting at stage boundaries.

pub mod coordinator;
pub mod progress;
pub mod stages;

pub use coordinator::{PipelineCoordinator, PipelineOptions};
pub use progress::{ChannelSink, NullSink, ProgressEvent, ProgressSink, SharedSink, StageStatus};
