//! Google Gemini Provider
//!
//! Completion provider over the Gemini `generateContent` API. Gemini has no
//! system role in `contents`; the system message travels in
//! `systemInstruction`, and `MAX_TOKENS` maps onto the shared `Length`
//! finish reason.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{Completion, CompletionProvider, FinishReason, Message, ProviderConfig};
use crate::types::{PlanError, Result};

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Gemini API provider with secure API key handling
pub struct GeminiProvider {
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("GEMINI_API_KEY").ok())
            .ok_or_else(|| {
                PlanError::Config(
                    "Gemini API key not found. Set GEMINI_API_KEY env var or provide in config"
                        .to_string(),
                )
            })?;

        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        let model = config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PlanError::Generation(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: SecretString::from(api_key_str),
            api_base,
            model,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn build_request(
        &self,
        prompt: &str,
        system: &str,
        history: &[Message],
    ) -> GenerateContentRequest {
        let mut contents = Vec::with_capacity(history.len() + 1);
        for turn in history {
            contents.push(Content {
                // Gemini calls the assistant role "model"
                role: if turn.role == "assistant" {
                    "model".to_string()
                } else {
                    "user".to_string()
                },
                parts: vec![Part {
                    text: turn.content.clone(),
                }],
            });
        }
        contents.push(Content {
            role: "user".to_string(),
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        });

        GenerateContentRequest {
            contents,
            system_instruction: (!system.is_empty()).then(|| SystemInstruction {
                parts: vec![Part {
                    text: system.to_string(),
                }],
            }),
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }

    async fn send(&self, method: &str, request: &GenerateContentRequest) -> Result<reqwest::Response> {
        let url = format!("{}/models/{}:{}", self.api_base, self.model, method);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| PlanError::Generation(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlanError::Generation(format!(
                "Gemini API error ({}): {}",
                status, body
            )));
        }
        Ok(response)
    }
}

fn extract_text(response: &GenerateContentResponse) -> String {
    response
        .candidates
        .first()
        .map(|c| {
            c.content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        history: &[Message],
    ) -> Result<Completion> {
        info!(model = %self.model, "generating with Gemini");

        let request = self.build_request(prompt, system, history);
        let response = self.send("generateContent", &request).await?;
        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PlanError::Generation(format!("Failed to parse Gemini response: {}", e)))?;

        let content = extract_text(&body);
        let finish_reason = body
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .map(FinishReason::from_provider)
            .unwrap_or(FinishReason::Other);

        debug!(?finish_reason, chars = content.len(), "Gemini response received");

        Ok(Completion {
            content,
            tokens_used: body
                .usage_metadata
                .map(|u| u.total_token_count)
                .unwrap_or(0),
            finish_reason,
        })
    }

    async fn complete_stream(
        &self,
        prompt: &str,
        system: &str,
        history: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let request = self.build_request(prompt, system, history);
        // alt=sse gives the same newline-delimited "data: " framing as OpenAI
        let response = self
            .send("streamGenerateContent?alt=sse", &request)
            .await?;
        let (tx, rx) = tokio::sync::mpsc::channel(32);

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = bytes.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx
                            .send(Err(PlanError::Generation(format!(
                                "Gemini stream error: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let Ok(parsed) = serde_json::from_str::<GenerateContentResponse>(data) else {
                        continue;
                    };
                    let text = extract_text(&parsed);
                    if !text.is_empty() && tx.send(Ok(text)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(super::channel_stream(rx))
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider() -> GeminiProvider {
        GeminiProvider {
            api_key: SecretString::from("test-key"),
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 100,
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn test_assistant_history_maps_to_model_role() {
        let history = vec![Message::user("q1"), Message::assistant("a1")];
        let request = provider().build_request("q2", "sys", &history);

        let roles: Vec<&str> = request.contents.iter().map(|c| c.role.as_str()).collect();
        assert_eq!(roles, ["user", "model", "user"]);
        assert!(request.system_instruction.is_some());
    }

    #[test]
    fn test_response_parsing_max_tokens() {
        let raw = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "partial" }] },
                "finishReason": "MAX_TOKENS"
            }],
            "usageMetadata": { "totalTokenCount": 42 }
        });
        let parsed: GenerateContentResponse = serde_json::from_value(raw).unwrap();

        assert_eq!(extract_text(&parsed), "partial");
        assert_eq!(
            parsed.candidates[0]
                .finish_reason
                .as_deref()
                .map(FinishReason::from_provider),
            Some(FinishReason::Length)
        );
        assert_eq!(parsed.usage_metadata.unwrap().total_token_count, 42);
    }
}
