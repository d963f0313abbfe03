//! PlanForge - Goal-to-Plan Generation Pipeline
//!
//! Turns a user's goal into a polished, actionable plan through three
//! sequential AI stages (research, planning, review), grounded in the
//! user's private document corpus via retrieval-augmented generation.
//!
//! ## Core Features
//!
//! - **Three-Stage Pipeline**: research -> plan -> review, each stage
//!   threading its output into the next
//! - **Private Corpus Retrieval**: documents chunked, embedded, and served
//!   back as source-labeled context
//! - **Truncation Recovery**: token-limited outputs are continued
//!   automatically up to a fixed bound
//! - **Progress Reporting**: fire-and-forget stage events for live UIs
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use planforge::ai::create_provider;
//! use planforge::pipeline::{NullSink, PipelineCoordinator, PipelineOptions};
//! use planforge::{Config, TaskRequest};
//!
//! let config = Config::default();
//! let provider = create_provider(&config.llm)?;
//! let coordinator = PipelineCoordinator::new(
//!     provider,
//!     None,
//!     Arc::new(NullSink),
//!     PipelineOptions::default(),
//! );
//! let run = coordinator.run(TaskRequest {
//!     title: "Learn Rust".into(),
//!     description: "Three months, evenings only".into(),
//!     ..Default::default()
//! }, None).await?;
//! ```
//!
//! ## Modules
//!
//! - [`ai`]: completion providers and the truncation-recovering executor
//! - [`rag`]: chunking, embedding, vector indexes, context assembly
//! - [`pipeline`]: the three-stage coordinator and progress sinks
//! - [`config`]: layered configuration loading

pub mod ai;
pub mod config;
pub mod constants;
pub mod logging;
pub mod pipeline;
pub mod rag;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{Config, ConfigLoader, IndexConfig, RagConfig};

// Error Types
pub use types::{PlanError, Result};

// Task & Run Types
pub use types::{Fragment, PipelineRun, RetrievalHit, RunStatus, Stage, StageOutput, TaskRequest};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use pipeline::{
    ChannelSink, NullSink, PipelineCoordinator, PipelineOptions, ProgressEvent, ProgressSink,
    StageStatus,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{
    create_provider, Completion, CompletionProvider, FinishReason, ProviderConfig, SharedProvider,
    StageExecutor,
};

// =============================================================================
// Retrieval Re-exports
// =============================================================================

pub use rag::{
    build_context, Chunker, DocumentInfo, EmbeddingGateway, HttpEmbeddingGateway, IndexReport,
    MemoryIndex, QdrantIndex, RagService, SearchOptions, SharedGateway, SharedIndex, VectorIndex,
};
