//! Configuration Types
//!
//! Top-level configuration joining the provider, embedding, index, and
//! retrieval sections. Every field has a default so a bare deployment runs
//! with only an API key in the environment; `validate()` rejects
//! combinations the pipeline cannot honor.

use serde::{Deserialize, Serialize};

use crate::ai::provider::ProviderConfig;
use crate::constants::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::constants::retrieval::{
    DEFAULT_SCORE_THRESHOLD, RESEARCH_CONTEXT_MAX_LENGTH, RESEARCH_TOP_K,
};
use crate::pipeline::PipelineOptions;
use crate::rag::{EmbeddingConfig, QdrantConfig};
use crate::types::{PlanError, Result};

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: ProviderConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub rag: RagConfig,
}

impl Config {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rag.chunk_size == 0 {
            return Err(PlanError::Config("rag.chunk_size must be > 0".to_string()));
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(PlanError::Config(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                self.rag.chunk_overlap, self.rag.chunk_size
            )));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(PlanError::Config(format!(
                "llm.temperature must be in [0.0, 2.0], got {}",
                self.llm.temperature
            )));
        }
        if self.llm.timeout_secs == 0 {
            return Err(PlanError::Config("llm.timeout_secs must be > 0".to_string()));
        }
        if self.embedding.dimension == 0 {
            return Err(PlanError::Config(
                "embedding.dimension must be > 0".to_string(),
            ));
        }
        match self.index.backend.as_str() {
            "memory" | "qdrant" => {}
            other => {
                return Err(PlanError::Config(format!(
                    "Unknown index backend: {}. Supported: memory, qdrant",
                    other
                )));
            }
        }
        Ok(())
    }
}

/// Vector index backend selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// "memory" or "qdrant"
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default)]
    pub qdrant: QdrantConfig,
}

fn default_backend() -> String {
    "memory".to_string()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            qdrant: QdrantConfig::default(),
        }
    }
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    #[serde(default = "default_context_max_length")]
    pub context_max_length: usize,
    /// Restrict research to the private corpus only
    #[serde(default)]
    pub corpus_only: bool,
    /// Continue without context when retrieval fails
    #[serde(default)]
    pub degrade_on_retrieval_error: bool,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

fn default_top_k() -> usize {
    RESEARCH_TOP_K
}

fn default_score_threshold() -> f32 {
    DEFAULT_SCORE_THRESHOLD
}

fn default_context_max_length() -> usize {
    RESEARCH_CONTEXT_MAX_LENGTH
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            score_threshold: default_score_threshold(),
            context_max_length: default_context_max_length(),
            corpus_only: false,
            degrade_on_retrieval_error: false,
        }
    }
}

impl From<&RagConfig> for PipelineOptions {
    fn from(rag: &RagConfig) -> Self {
        Self {
            rag_top_k: rag.top_k,
            rag_score_threshold: rag.score_threshold,
            context_max_length: rag.context_max_length,
            corpus_only: rag.corpus_only,
            degrade_on_retrieval_error: rag.degrade_on_retrieval_error,
        }
    }
}
