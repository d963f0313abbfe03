//! AI Generation Layer
//!
//! Completion providers and the stage executor that drives them.

pub mod executor;
pub mod provider;

pub use executor::StageExecutor;
pub use provider::{
    create_provider, Completion, CompletionProvider, FinishReason, GeminiProvider, Message,
    OpenAiProvider, ProviderConfig, SharedProvider,
};
