//! In-Memory Vector Index
//!
//! Exact cosine-similarity search over a DashMap-backed store. Fast enough
//! for private corpora in the tens of thousands of fragments, and the
//! default backend for tests and single-process deployments.
//!
//! Scores are normalized cosine similarity mapped into `[0, 1]`.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tracing::debug;

use super::index::{AttributeFilter, IndexStats, VectorIndex, VectorPoint};
use crate::types::{PlanError, Result, RetrievalHit};

/// Exact nearest-neighbor index held entirely in process memory.
pub struct MemoryIndex {
    dimension: usize,
    points: DashMap<String, VectorPoint>,
}

impl MemoryIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            points: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn matches(filter: &AttributeFilter, point: &VectorPoint) -> bool {
        filter
            .iter()
            .all(|(key, value)| point.metadata.get(key) == Some(value))
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        for point in points {
            if point.vector.len() != self.dimension {
                return Err(PlanError::Retrieval(format!(
                    "vector dimension mismatch: expected {}, got {}",
                    self.dimension,
                    point.vector.len()
                )));
            }
            self.points.insert(point.id.clone(), point);
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &AttributeFilter,
        score_threshold: f32,
    ) -> Result<Vec<RetrievalHit>> {
        if vector.len() != self.dimension {
            return Err(PlanError::Retrieval(format!(
                "query dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }

        let mut scored: Vec<RetrievalHit> = self
            .points
            .iter()
            .filter(|entry| Self::matches(filter, entry.value()))
            .filter_map(|entry| {
                let point = entry.value();
                let score = cosine_similarity(vector, &point.vector);
                if score < score_threshold {
                    return None;
                }
                let text = point
                    .metadata
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let mut metadata = point.metadata.clone();
                metadata.remove("text");
                Some(RetrievalHit {
                    id: point.id.clone(),
                    score,
                    text,
                    metadata,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        debug!(hits = scored.len(), "memory index query");
        Ok(scored)
    }

    async fn delete_by_attribute(&self, key: &str, value: &Value) -> Result<u64> {
        let before = self.points.len();
        self.points
            .retain(|_, point| point.metadata.get(key) != Some(value));
        Ok((before - self.points.len()) as u64)
    }

    async fn stats(&self) -> Result<IndexStats> {
        Ok(IndexStats {
            count: self.points.len(),
            dimension: self.dimension,
            status: "green".to_string(),
        })
    }
}

/// Cosine similarity mapped from `[-1, 1]` into `[0, 1]`.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    let cosine = dot / (mag_a * mag_b);
    (cosine + 1.0) / 2.0
}
