//! Pipeline Data Contracts
//!
//! Stage inputs/outputs and the run record the coordinator mutates while it
//! owns a pipeline execution. A `PipelineRun` is handed to the caller
//! read-only once the run completes or fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

// =============================================================================
// Task Input
// =============================================================================

/// The user's goal description, as submitted to the pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    pub description: String,
    /// Free-form category ("study", "project", "custom", ...)
    #[serde(default = "default_task_type")]
    pub task_type: String,
    /// Used to scope retrieval to the submitting user's corpus
    #[serde(default)]
    pub user_id: Option<String>,
}

fn default_task_type() -> String {
    "custom".to_string()
}

// =============================================================================
// Stage Identity & Output
// =============================================================================

/// The three ordered generation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Researcher,
    Planner,
    Reviewer,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Planner => "planner",
            Self::Reviewer => "reviewer",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of one stage, threaded into the next stage's prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: Stage,
    pub content: String,
    pub tokens_used: u32,
    /// True when the output hit the model's length limit and the
    /// continuation bound was exhausted without a natural stop.
    pub truncated: bool,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl StageOutput {
    pub fn new(stage: Stage, content: impl Into<String>) -> Self {
        Self {
            stage,
            content: content.into(),
            tokens_used: 0,
            truncated: false,
            metadata: HashMap::new(),
        }
    }
}

// =============================================================================
// Pipeline Run
// =============================================================================

/// Run lifecycle. Transitions are monotonic:
/// Pending -> Running -> {Completed | Failed}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

/// Record of one end-to-end pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub id: Uuid,
    pub task: TaskRequest,
    /// Completed stage outputs, in execution order
    pub stages: Vec<StageOutput>,
    pub status: RunStatus,
    /// Populated when status is Failed
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineRun {
    pub fn new(task: TaskRequest) -> Self {
        Self {
            id: Uuid::new_v4(),
            task,
            stages: Vec::new(),
            status: RunStatus::Pending,
            error: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Apply a status transition, ignoring illegal ones.
    pub(crate) fn transition(&mut self, next: RunStatus) {
        if self.status.can_transition_to(next) {
            self.status = next;
            if matches!(next, RunStatus::Completed | RunStatus::Failed) {
                self.finished_at = Some(Utc::now());
            }
        }
    }

    /// Output of a given stage, if it ran.
    pub fn stage_output(&self, stage: Stage) -> Option<&StageOutput> {
        self.stages.iter().find(|s| s.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_monotonic() {
        assert!(RunStatus::Pending.can_transition_to(RunStatus::Running));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Completed));
        assert!(RunStatus::Running.can_transition_to(RunStatus::Failed));

        assert!(!RunStatus::Failed.can_transition_to(RunStatus::Running));
        assert!(!RunStatus::Completed.can_transition_to(RunStatus::Failed));
        assert!(!RunStatus::Pending.can_transition_to(RunStatus::Completed));
    }

    #[test]
    fn test_illegal_transition_ignored() {
        let mut run = PipelineRun::new(TaskRequest::default());
        run.transition(RunStatus::Completed);
        assert_eq!(run.status, RunStatus::Pending);

        run.transition(RunStatus::Running);
        run.transition(RunStatus::Failed);
        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.finished_at.is_some());

        // No stage runs after Failed
        run.transition(RunStatus::Completed);
        assert_eq!(run.status, RunStatus::Failed);
    }

    #[test]
    fn test_stage_output_lookup() {
        let mut run = PipelineRun::new(TaskRequest::default());
        run.stages
            .push(StageOutput::new(Stage::Researcher, "findings"));

        assert_eq!(
            run.stage_output(Stage::Researcher).map(|s| s.content.as_str()),
            Some("findings")
        );
        assert!(run.stage_output(Stage::Planner).is_none());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Researcher.name(), "researcher");
        assert_eq!(Stage::Planner.to_string(), "planner");
        assert_eq!(Stage::Reviewer.name(), "reviewer");
    }
}
