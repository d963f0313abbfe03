//! OpenAI Chat Completions Provider
//!
//! Completion provider over OpenAI's Chat Completions API (also serves any
//! OpenAI-compatible endpoint via `api_base`). Reports the `finish_reason`
//! of the first choice so callers can detect token-limit truncation.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::{Completion, CompletionProvider, FinishReason, Message, ProviderConfig};
use crate::types::{PlanError, Result};

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI API provider with secure API key handling
pub struct OpenAiProvider {
    /// API key stored securely - never exposed in logs or debug output
    api_key: SecretString,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let api_key_str = config
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                PlanError::Config(
                    "OpenAI API key not found. Set OPENAI_API_KEY env var or provide in config"
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

    fn build_messages(&self, prompt: &str, system: &str, history: &[Message]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        for turn in history {
            messages.push(ChatMessage {
                role: turn.role.clone(),
                content: turn.content.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        });
        messages
    }

    async fn send(&self, request: &ChatCompletionRequest) -> Result<reqwest::Response> {
        let url = format!("{}/chat/completions", self.api_base);
        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| PlanError::Generation(format!("OpenAI request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlanError::Generation(format!(
                "OpenAI API error ({}): {}",
                status, body
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        history: &[Message],
    ) -> Result<Completion> {
        info!(model = %self.model, "generating with OpenAI");

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: self.build_messages(prompt, system, history),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            stream: false,
        };

        let response = self.send(&request).await?;
        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| PlanError::Generation(format!("Failed to parse OpenAI response: {}", e)))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PlanError::Generation("No choices in OpenAI response".to_string()))?;

        let content = choice.message.content.unwrap_or_default();
        let finish_reason = choice
            .finish_reason
            .as_deref()
            .map(FinishReason::from_provider)
            .unwrap_or(FinishReason::Other);

        debug!(?finish_reason, chars = content.len(), "OpenAI response received");

        Ok(Completion {
            content,
            tokens_used: body.usage.map(|u| u.total_tokens).unwrap_or(0),
            finish_reason,
        })
    }

    async fn complete_stream(
        &self,
        prompt: &str,
        system: &str,
        history: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: self.build_messages(prompt, system, history),
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            stream: true,
        };

        let response = self.send(&request).await?;
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
                                "OpenAI stream error: {}",
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
                    if data == "[DONE]" {
                        return;
                    }
                    let Ok(parsed) = serde_json::from_str::<StreamChunk>(data) else {
                        continue;
                    };
                    let text = parsed
                        .choices
                        .into_iter()
                        .next()
                        .and_then(|c| c.delta.content)
                        .unwrap_or_default();
                    if !text.is_empty() && tx.send(Ok(text)).await.is_err() {
                        return;
                    }
                }
            }
        });

        Ok(super::channel_stream(rx))
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageInfo {
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
