//! Qdrant Vector Index
//!
//! `VectorIndex` backend over Qdrant's REST API: collection bootstrap with
//! cosine distance, batched upserts, filtered similarity search with a score
//! threshold, and filter-based deletion.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

use super::index::{AttributeFilter, IndexStats, VectorIndex, VectorPoint};
use crate::types::{PlanError, Result, RetrievalHit};

/// Points uploaded per upsert request.
const UPSERT_BATCH_SIZE: usize = 100;

/// Configuration for a Qdrant-backed index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    pub collection: String,
    pub dimension: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6333".to_string(),
            collection: "knowledge_base".to_string(),
            dimension: 1536,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Qdrant REST client implementing the `VectorIndex` contract.
pub struct QdrantIndex {
    config: QdrantConfig,
    client: reqwest::Client,
}

impl QdrantIndex {
    pub fn new(config: QdrantConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PlanError::Retrieval(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    /// Create the collection if it does not already exist.
    pub async fn ensure_collection(&self) -> Result<()> {
        let url = format!("{}/collections/{}", self.config.url, self.config.collection);

        let exists = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Qdrant unreachable: {}", e)))?
            .status()
            .is_success();

        if exists {
            debug!(collection = %self.config.collection, "collection already exists");
            return Ok(());
        }

        let body = json!({
            "vectors": { "size": self.config.dimension, "distance": "Cosine" }
        });
        let response = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Qdrant unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(PlanError::Retrieval(format!(
                "Failed to create collection ({}): {}",
                status, text
            )));
        }

        info!(collection = %self.config.collection, "created collection");
        Ok(())
    }

    fn attribute_filter(filter: &AttributeFilter) -> Option<Value> {
        if filter.is_empty() {
            return None;
        }
        let conditions: Vec<Value> = filter
            .iter()
            .map(|(key, value)| json!({ "key": key, "match": { "value": value } }))
            .collect();
        Some(json!({ "must": conditions }))
    }

    async fn check(&self, response: reqwest::Response, op: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        Err(PlanError::Retrieval(format!(
            "Qdrant {} failed ({}): {}",
            op, status, text
        )))
    }
}

#[async_trait]
impl VectorIndex for QdrantIndex {
    async fn upsert(&self, points: Vec<VectorPoint>) -> Result<()> {
        let url = format!(
            "{}/collections/{}/points?wait=true",
            self.config.url, self.config.collection
        );

        for batch in points.chunks(UPSERT_BATCH_SIZE) {
            let body = json!({
                "points": batch
                    .iter()
                    .map(|p| json!({ "id": p.id, "vector": p.vector, "payload": p.metadata }))
                    .collect::<Vec<_>>()
            });
            let response = self
                .client
                .put(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| PlanError::Retrieval(format!("Qdrant upsert failed: {}", e)))?;
            self.check(response, "upsert").await?;
        }

        debug!(count = points.len(), "upserted points");
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        filter: &AttributeFilter,
        score_threshold: f32,
    ) -> Result<Vec<RetrievalHit>> {
        let url = format!(
            "{}/collections/{}/points/search",
            self.config.url, self.config.collection
        );

        let mut body = json!({
            "vector": vector,
            "limit": top_k,
            "score_threshold": score_threshold,
            "with_payload": true,
        });
        if let Some(qdrant_filter) = Self::attribute_filter(filter) {
            body["filter"] = qdrant_filter;
        }

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Qdrant search failed: {}", e)))?;
        let response = self.check(response, "search").await?;

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Failed to parse search response: {}", e)))?;

        let hits = parsed
            .result
            .into_iter()
            .map(|row| {
                let mut metadata = row.payload;
                let text = metadata
                    .remove("text")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                RetrievalHit {
                    id: row.id.to_string().trim_matches('"').to_string(),
                    score: row.score,
                    text,
                    metadata: metadata.into_iter().collect(),
                }
            })
            .collect();

        Ok(hits)
    }

    async fn delete_by_attribute(&self, key: &str, value: &Value) -> Result<u64> {
        let url = format!(
            "{}/collections/{}/points/delete?wait=true",
            self.config.url, self.config.collection
        );
        let mut filter = AttributeFilter::new();
        filter.insert(key.to_string(), value.clone());
        let body = json!({ "filter": Self::attribute_filter(&filter) });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Qdrant delete failed: {}", e)))?;
        self.check(response, "delete").await?;

        // Qdrant's delete acknowledgement does not include a removed count.
        Ok(0)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let url = format!("{}/collections/{}", self.config.url, self.config.collection);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Qdrant info failed: {}", e)))?;
        let response = self.check(response, "info").await?;

        let parsed: CollectionInfoResponse = response
            .json()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Failed to parse collection info: {}", e)))?;

        Ok(IndexStats {
            count: parsed.result.points_count.unwrap_or(0),
            dimension: self.config.dimension,
            status: parsed.result.status,
        })
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    id: Value,
    score: f32,
    #[serde(default)]
    payload: serde_json::Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct CollectionInfoResponse {
    result: CollectionInfo,
}

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    status: String,
    points_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_filter_shape() {
        let mut filter = AttributeFilter::new();
        filter.insert("user_id".to_string(), json!("u-1"));

        let built = QdrantIndex::attribute_filter(&filter).unwrap();
        let conditions = built["must"].as_array().unwrap();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0]["key"], "user_id");
        assert_eq!(conditions[0]["match"]["value"], "u-1");
    }

    #[test]
    fn test_empty_filter_omitted() {
        assert!(QdrantIndex::attribute_filter(&AttributeFilter::new()).is_none());
    }

    #[test]
    fn test_search_response_parsing() {
        let raw = json!({
            "result": [
                { "id": "p-1", "score": 0.87, "payload": { "text": "body", "file_id": "f1" } }
            ]
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.result.len(), 1);
        assert_eq!(parsed.result[0].score, 0.87);
    }
}
