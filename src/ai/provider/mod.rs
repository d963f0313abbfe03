//! Completion Provider Abstraction
//!
//! Defines the `CompletionProvider` trait for free-form text generation.
//! All providers return a `Completion` carrying the content, token usage,
//! and the finish reason the stage executor uses to detect truncation.
//!
//! ## Modules
//!
//! - `openai`: OpenAI-compatible Chat Completions backend
//! - `gemini`: Google Gemini generateContent backend

mod gemini;
mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::Result;

// =============================================================================
// Completion Result
// =============================================================================

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// Natural end of output
    Stop,
    /// Output hit the token limit and is incomplete
    Length,
    /// Anything else (content filter, tool call, unknown)
    Other,
}

impl FinishReason {
    /// Map a provider's finish-reason string onto the shared vocabulary.
    /// OpenAI reports `"stop"`/`"length"`, Gemini reports `"STOP"`/`"MAX_TOKENS"`.
    pub fn from_provider(raw: &str) -> Self {
        match raw {
            "stop" | "STOP" => FinishReason::Stop,
            "length" | "MAX_TOKENS" => FinishReason::Length,
            _ => FinishReason::Other,
        }
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, FinishReason::Length)
    }
}

/// One model response.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    /// Total tokens (prompt + completion) reported by the provider, 0 if absent
    pub tokens_used: u32,
    pub finish_reason: FinishReason,
}

/// One turn of conversation history passed back to the provider on
/// continuation calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// `"user"` or `"assistant"`
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Shared provider type for concurrent access across pipeline stages.
pub type SharedProvider = Arc<dyn CompletionProvider + Send + Sync>;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for completion providers
///
/// Note: API keys are handled securely - they are never serialized to output
/// and are redacted in debug output. Each provider converts the key to
/// SecretString internally for runtime protection.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type: "openai", "gemini"
    pub provider: String,
    /// Model name (provider-specific)
    pub model: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,
    /// API key - never serialized to output for security
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Maximum tokens to generate per call
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_base", &self.api_base)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn default_max_tokens() -> usize {
    4096
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: None,
            timeout_secs: 300,
            temperature: 0.7,
            api_key: None,
            api_base: None,
            max_tokens: 4096,
        }
    }
}

// =============================================================================
// Completion Provider Trait
// =============================================================================

/// Completion provider trait for free-form generation.
///
/// `history` carries prior turns of the same exchange; the implementation
/// sends system, then history in order, then the prompt as the final user
/// message.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a completion for the prompt.
    async fn complete(
        &self,
        prompt: &str,
        system: &str,
        history: &[Message],
    ) -> Result<Completion>;

    /// Generate a completion as a stream of content deltas.
    async fn complete_stream(
        &self,
        prompt: &str,
        system: &str,
        history: &[Message],
    ) -> Result<BoxStream<'static, Result<String>>>;

    /// Provider name for logging
    fn name(&self) -> &str;

    /// Model name currently in use
    fn model(&self) -> &str;
}

/// Turn an mpsc receiver of content deltas into the boxed stream shape
/// `complete_stream` returns. The producing task owns the HTTP response and
/// ends the stream by dropping the sender.
pub(crate) fn channel_stream(
    rx: tokio::sync::mpsc::Receiver<Result<String>>,
) -> BoxStream<'static, Result<String>> {
    Box::pin(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|item| (item, rx))
    }))
}

/// Create a shared provider from configuration
pub fn create_provider(config: &ProviderConfig) -> Result<SharedProvider> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.clone())?)),
        "gemini" => Ok(Arc::new(GeminiProvider::new(config.clone())?)),
        _ => Err(crate::types::PlanError::Config(format!(
            "Unknown provider: {}. Supported: openai, gemini",
            config.provider
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(FinishReason::from_provider("stop"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("STOP"), FinishReason::Stop);
        assert_eq!(FinishReason::from_provider("length"), FinishReason::Length);
        assert_eq!(
            FinishReason::from_provider("MAX_TOKENS"),
            FinishReason::Length
        );
        assert_eq!(
            FinishReason::from_provider("content_filter"),
            FinishReason::Other
        );
        assert!(FinishReason::Length.is_truncated());
        assert!(!FinishReason::Stop.is_truncated());
    }

    #[test]
    fn test_provider_config_debug_redacts_key() {
        let config = ProviderConfig {
            api_key: Some("sk-secret".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ProviderConfig {
            provider: "mystery".to_string(),
            ..Default::default()
        };
        assert!(create_provider(&config).is_err());
    }
}
