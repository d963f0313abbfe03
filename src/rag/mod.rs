//! Retrieval Pipeline
//!
//! Turns uploaded documents into searchable fragments and reassembles them
//! into bounded context for generation: extract → chunk → embed → store on
//! the write path, embed → query → render on the read path.
//!
//! The embedding gateway and vector index are injected at construction —
//! there are no process-wide singletons, and both can be substituted in
//! tests.

pub mod chunker;
pub mod context;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod memory;
pub mod qdrant;

pub use chunker::{normalize_whitespace, Chunker};
pub use context::build_context;
pub use embedding::{EmbeddingConfig, EmbeddingGateway, HttpEmbeddingGateway, SharedGateway};
pub use index::{AttributeFilter, IndexStats, SharedIndex, VectorIndex, VectorPoint};
pub use memory::MemoryIndex;
pub use qdrant::{QdrantConfig, QdrantIndex};

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::constants::chunking::MIN_DOCUMENT_CHARS;
use crate::constants::retrieval::{DEFAULT_SCORE_THRESHOLD, DEFAULT_TOP_K};
use crate::types::{PlanError, Result, RetrievalHit};

// =============================================================================
// Requests & Reports
// =============================================================================

/// Identity of a document being ingested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_id: String,
    pub filename: String,
    pub file_type: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Outcome of one completed ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexReport {
    pub file_id: String,
    pub chunks_count: usize,
    pub vector_ids: Vec<String>,
    pub total_characters: usize,
}

/// Query-time knobs.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub top_k: usize,
    pub score_threshold: f32,
    /// Restrict hits to this user's corpus
    pub user_id: Option<String>,
    /// Restrict hits to specific documents
    pub file_ids: Option<Vec<String>>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            user_id: None,
            file_ids: None,
        }
    }
}

// =============================================================================
// RAG Service
// =============================================================================

/// High-level retrieval service over an embedding gateway and vector index.
pub struct RagService {
    gateway: SharedGateway,
    index: SharedIndex,
    chunker: Chunker,
}

impl RagService {
    pub fn new(gateway: SharedGateway, index: SharedIndex, chunker: Chunker) -> Self {
        Self {
            gateway,
            index,
            chunker,
        }
    }

    /// Extract, chunk, embed and store a document. The document only becomes
    /// queryable once every step has succeeded; any failure along the way
    /// surfaces before an `IndexReport` is produced.
    #[instrument(skip(self), fields(file_id = %doc.file_id))]
    pub async fn index_document(
        &self,
        path: &Path,
        doc: DocumentInfo,
    ) -> Result<IndexReport> {
        let text = extract::extract_text(path, &doc.file_type)?;
        self.index_text(&text, doc).await
    }

    /// Ingest already-extracted text (the path used by callers with their
    /// own decoders for binary formats).
    pub async fn index_text(&self, text: &str, doc: DocumentInfo) -> Result<IndexReport> {
        if text.trim().len() < MIN_DOCUMENT_CHARS {
            return Err(PlanError::extraction(
                doc.filename.clone(),
                "document contains insufficient text content",
            ));
        }

        let fragments = self.chunker.chunk(text, &doc.file_id);
        info!(chunks = fragments.len(), "document split into chunks");

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = self.gateway.encode(&texts).await?;

        let mut points = Vec::with_capacity(fragments.len());
        let mut vector_ids = Vec::with_capacity(fragments.len());
        for (fragment, vector) in fragments.iter().zip(vectors) {
            let id = Uuid::new_v4().to_string();
            let mut metadata = HashMap::new();
            metadata.insert("file_id".to_string(), json!(doc.file_id));
            metadata.insert("filename".to_string(), json!(doc.filename));
            metadata.insert("file_type".to_string(), json!(doc.file_type));
            if let Some(user_id) = &doc.user_id {
                metadata.insert("user_id".to_string(), json!(user_id));
            }
            metadata.insert("chunk_index".to_string(), json!(fragment.index));
            metadata.insert("total_chunks".to_string(), json!(fragment.total_siblings));
            metadata.insert("chunk_size".to_string(), json!(fragment.byte_length));
            metadata.insert("text".to_string(), json!(fragment.text));

            points.push(VectorPoint {
                id: id.clone(),
                vector,
                metadata,
            });
            vector_ids.push(id);
        }

        let chunks_count = points.len();
        self.index.upsert(points).await?;

        info!(chunks = chunks_count, "document indexed");
        Ok(IndexReport {
            file_id: doc.file_id,
            chunks_count,
            vector_ids,
            total_characters: text.len(),
        })
    }

    /// Embed the query and return ranked fragments from the index.
    #[instrument(skip(self, options))]
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<RetrievalHit>> {
        let vectors = self.gateway.encode(&[query.to_string()]).await?;
        let query_vector = vectors
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::Retrieval("embedding gateway returned no vector".into()))?;

        let mut filter = AttributeFilter::new();
        if let Some(user_id) = &options.user_id {
            filter.insert("user_id".to_string(), json!(user_id));
        }

        let mut hits = self
            .index
            .query(&query_vector, options.top_k, &filter, options.score_threshold)
            .await?;

        if let Some(file_ids) = &options.file_ids {
            hits.retain(|hit| {
                hit.source_id()
                    .map(|id| file_ids.iter().any(|f| f == id))
                    .unwrap_or(false)
            });
        }

        info!(hits = hits.len(), "search completed");
        Ok(hits)
    }

    /// Remove every fragment belonging to a document.
    pub async fn delete_document(&self, file_id: &str) -> Result<u64> {
        self.index.delete_by_attribute("file_id", &json!(file_id)).await
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        self.index.stats().await
    }

    /// Render hits into a bounded context block (delegates to the pure
    /// renderer; ordering policy stays with the caller).
    pub fn build_context(&self, hits: &[RetrievalHit], max_length: usize) -> String {
        context::build_context(hits, max_length)
    }
}
