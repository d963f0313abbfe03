//! Embedding Gateway
//!
//! Converts text into fixed-dimension vectors. The gateway is an external
//! capability consumed behind a trait so the retrieval pipeline can be
//! exercised with a substitute implementation.
//!
//! The HTTP implementation targets OpenAI-compatible `/embeddings` endpoints
//! (OpenAI, Azure, vLLM, LiteLLM): batched input, response rows re-ordered
//! by their `index` field, transient failures retried with exponential
//! backoff.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::embedding::{MAX_BATCH_SIZE, MAX_RETRIES, RETRY_BASE_DELAY_MS};
use crate::types::{PlanError, Result};

/// Deterministic text-to-vector capability with a fixed dimension per
/// deployment.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    /// Encode a batch of texts, one vector per input, in input order.
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Dimension of every vector this gateway produces.
    fn dimension(&self) -> usize;
}

/// Shared gateway handle.
pub type SharedGateway = Arc<dyn EmbeddingGateway>;

// =============================================================================
// HTTP Gateway (OpenAI-compatible)
// =============================================================================

/// Configuration for the HTTP embedding gateway.
#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Endpoint base, e.g. `https://api.openai.com/v1`
    pub api_base: String,
    pub model: String,
    pub dimension: usize,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimension: 1536,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Embedding gateway over an OpenAI-compatible HTTP endpoint.
pub struct HttpEmbeddingGateway {
    api_key: SecretString,
    api_base: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
}

impl HttpEmbeddingGateway {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                PlanError::Config(
                    "Embedding API key not found. Set OPENAI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PlanError::Retrieval(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base: config.api_base,
            model: config.model,
            dimension: config.dimension,
            client,
        })
    }

    async fn encode_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.api_base);
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: batch.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlanError::Retrieval(format!(
                "Embedding API error ({}): {}",
                status, body
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| PlanError::Retrieval(format!("Failed to parse embedding response: {}", e)))?;

        // Response rows may arrive out of order; restore input order by index.
        let mut rows = body.data;
        rows.sort_by_key(|row| row.index);

        if rows.len() != batch.len() {
            return Err(PlanError::Retrieval(format!(
                "Embedding response row count mismatch: sent {}, received {}",
                batch.len(),
                rows.len()
            )));
        }

        for row in &rows {
            if row.embedding.len() != self.dimension {
                return Err(PlanError::Retrieval(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    self.dimension,
                    row.embedding.len()
                )));
            }
        }

        Ok(rows.into_iter().map(|row| row.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingGateway for HttpEmbeddingGateway {
    async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            let backoff = ExponentialBuilder::default()
                .with_min_delay(Duration::from_millis(RETRY_BASE_DELAY_MS))
                .with_max_times(MAX_RETRIES);

            let rows = (|| async { self.encode_batch(batch).await })
                .retry(backoff)
                .when(|e: &PlanError| e.is_transient())
                .notify(|err, dur| {
                    warn!("embedding batch failed, retrying in {:?}: {}", dur, err);
                })
                .await?;

            vectors.extend(rows);
        }

        debug!(count = vectors.len(), "encoded texts");
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_debug_redacts_key() {
        let config = EmbeddingConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_new_without_key_fails() {
        // Guard against ambient credentials leaking into the test.
        if std::env::var("OPENAI_API_KEY").is_ok() {
            return;
        }
        let result = HttpEmbeddingGateway::new(EmbeddingConfig::default());
        assert!(matches!(result, Err(PlanError::Config(_))));
    }
}
