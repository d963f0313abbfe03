//! Vector Index Abstraction
//!
//! Boundary contract for vector storage: upsert with metadata, filtered
//! nearest-neighbor queries, attribute-based deletion, and stats. Concrete
//! backends are injected at construction so the pipeline is testable with a
//! substitute index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{Result, RetrievalHit};

/// One vector with its payload, as written to an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    /// Payload; the fragment text itself is stored under the `text` key so a
    /// hit can be rendered without a second lookup.
    pub metadata: HashMap<String, Value>,
}

/// Collection-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub count: usize,
    pub dimension: usize,
    pub status: String,
}

/// Equality filters on metadata attributes (all must match).
pub type AttributeFilter = HashMap<String, Value>;

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace points by id.
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()>;

    /// Nearest-neighbor query. Hits are ordered by descending similarity and
    /// filtered to `score_threshold` and the given attribute equalities.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &AttributeFilter,
        score_threshold: f32,
    ) -> Result<Vec<RetrievalHit>>;

    /// Delete every point whose metadata attribute `key` equals `value`.
    /// Returns the number of points removed, when the backend reports it.
    async fn delete_by_attribute(&self, key: &str, value: &Value) -> Result<u64>;

    async fn stats(&self) -> Result<IndexStats>;
}

/// Shared index handle for concurrent access across tasks.
pub type SharedIndex = Arc<dyn VectorIndex>;
