//! Unified Error Type System
//!
//! Centralized error types for the entire crate.
//!
//! ## Taxonomy
//!
//! - **Config**: invalid parameters (e.g. overlap >= chunk size); raised at
//!   construction, never mid-document
//! - **Extraction**: a document could not be decoded into text; the document
//!   is never partially indexed
//! - **Retrieval**: the embedding gateway or vector index is unavailable
//! - **Generation**: the completion capability's first call failed hard
//! - **Pipeline**: a stage left the run in a failed state
//!
//! Truncation exhaustion is deliberately absent: a stage that runs out of
//! continuation attempts still returns a `StageOutput` flagged `truncated`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("Config error: {0}")]
    Config(String),

    #[error("Extraction failed for {path}: {message}")]
    Extraction { path: String, message: String },

    #[error("Retrieval unavailable: {0}")]
    Retrieval(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Pipeline error in stage {stage}: {message}")]
    Pipeline { stage: String, message: String },
}

impl PlanError {
    /// Create an extraction error
    pub fn extraction(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a pipeline error tagged with the stage that failed
    pub fn pipeline(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Pipeline {
            stage: stage.into(),
            message: message.into(),
        }
    }

    /// True for errors that leave no inconsistent state behind and may be
    /// retried by an outer layer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Retrieval(_) | Self::Http(_))
    }
}

pub type Result<T> = std::result::Result<T, PlanError>;
