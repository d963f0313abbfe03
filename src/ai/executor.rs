//! Stage Executor
//!
//! Runs a single pipeline stage against a completion provider and recovers
//! from token-limit truncation. When the provider reports `Length`, the
//! executor replays the tail of the accumulated output and asks the model
//! to continue, up to a fixed bound. Exhausting the bound is not an error;
//! the output is returned with `truncated` set.

use tracing::{debug, info, warn};

use crate::ai::provider::{Completion, FinishReason, Message, SharedProvider};
use crate::constants::executor::{CONTINUATION_TAIL_CHARS, MAX_CONTINUATIONS};
use crate::types::{Result, Stage, StageOutput};

/// Continuation state after a completion call.
enum State {
    Complete,
    NeedsContinuation,
}

impl From<FinishReason> for State {
    fn from(reason: FinishReason) -> Self {
        if reason.is_truncated() {
            State::NeedsContinuation
        } else {
            State::Complete
        }
    }
}

/// Executes stage prompts with truncation recovery.
pub struct StageExecutor {
    provider: SharedProvider,
}

impl StageExecutor {
    pub fn new(provider: SharedProvider) -> Self {
        Self { provider }
    }

    /// Run one stage to completion.
    ///
    /// The first call's error propagates untouched; once any content has
    /// been produced, a failing continuation call stops recovery and the
    /// accumulated output is kept.
    pub async fn run(
        &self,
        stage: Stage,
        prompt: &str,
        system: &str,
        history: &[Message],
    ) -> Result<StageOutput> {
        info!(stage = %stage, provider = self.provider.name(), "running stage");

        let first = self.provider.complete(prompt, system, history).await?;

        let mut segments = vec![first.content];
        let mut tokens_used = first.tokens_used;
        let mut state = State::from(first.finish_reason);
        let mut continuations = 0;

        while let State::NeedsContinuation = state {
            if continuations >= MAX_CONTINUATIONS {
                warn!(stage = %stage, "continuation bound exhausted, output stays truncated");
                break;
            }
            continuations += 1;

            let accumulated = segments.join("\n\n");
            let continuation_prompt = build_continuation_prompt(&accumulated);
            let mut turns = history.to_vec();
            turns.push(Message::user(prompt));
            turns.push(Message::assistant(accumulated.clone()));

            debug!(stage = %stage, attempt = continuations, "requesting continuation");
            match self
                .provider
                .complete(&continuation_prompt, system, &turns)
                .await
            {
                Ok(Completion {
                    content,
                    tokens_used: tokens,
                    finish_reason,
                }) => {
                    segments.push(content);
                    tokens_used += tokens;
                    state = State::from(finish_reason);
                }
                Err(e) => {
                    // Partial output beats none; the stage keeps what it has.
                    warn!(stage = %stage, error = %e, "continuation failed, keeping partial output");
                    break;
                }
            }
        }

        let truncated = matches!(state, State::NeedsContinuation);
        let content = segments.join("\n\n");

        info!(
            stage = %stage,
            chars = content.len(),
            tokens = tokens_used,
            truncated,
            "stage finished"
        );

        let mut output = StageOutput::new(stage, content);
        output.tokens_used = tokens_used;
        output.truncated = truncated;
        Ok(output)
    }
}

/// Continuation prompt replaying the tail of what the model already wrote.
fn build_continuation_prompt(accumulated: &str) -> String {
    let tail_start = accumulated
        .char_indices()
        .rev()
        .nth(CONTINUATION_TAIL_CHARS.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    format!(
        "Please continue from where you left off. Previous content:\n\n{}\n\nContinue with the remaining sections...",
        &accumulated[tail_start..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use std::sync::Arc;
    use std::sync::Mutex;

    use crate::ai::provider::CompletionProvider;
    use crate::types::PlanError;

    /// Scripted provider: returns canned completions in order, recording the
    /// prompts it receives.
    struct ScriptedProvider {
        script: Mutex<Vec<Result<Completion>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<Completion>>) -> Self {
            Self {
                script: Mutex::new(script),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    fn completion(content: &str, tokens: u32, reason: FinishReason) -> Result<Completion> {
        Ok(Completion {
            content: content.to_string(),
            tokens_used: tokens,
            finish_reason: reason,
        })
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        async fn complete(
            &self,
            prompt: &str,
            _system: &str,
            _history: &[Message],
        ) -> Result<Completion> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Err(PlanError::Generation("script exhausted".into()));
            }
            script.remove(0)
        }

        async fn complete_stream(
            &self,
            _prompt: &str,
            _system: &str,
            _history: &[Message],
        ) -> Result<BoxStream<'static, Result<String>>> {
            Err(PlanError::Generation("not scripted".into()))
        }

        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-1"
        }
    }

    #[tokio::test]
    async fn test_single_call_when_not_truncated() {
        let provider = Arc::new(ScriptedProvider::new(vec![completion(
            "done",
            10,
            FinishReason::Stop,
        )]));
        let executor = StageExecutor::new(provider.clone());

        let output = executor.run(Stage::Planner, "plan it", "sys", &[]).await.unwrap();
        assert_eq!(output.content, "done");
        assert_eq!(output.tokens_used, 10);
        assert!(!output.truncated);
        assert_eq!(provider.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_truncation_recovered_within_bound() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            completion("part one", 10, FinishReason::Length),
            completion("part two", 20, FinishReason::Length),
            completion("part three", 30, FinishReason::Stop),
        ]));
        let executor = StageExecutor::new(provider.clone());

        let output = executor.run(Stage::Planner, "plan it", "sys", &[]).await.unwrap();
        assert_eq!(output.content, "part one\n\npart two\n\npart three");
        assert_eq!(output.tokens_used, 60);
        assert!(!output.truncated);

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[1].contains("continue from where you left off"));
        assert!(prompts[1].contains("part one"));
        assert!(prompts[2].contains("part two"));
    }

    #[tokio::test]
    async fn test_bound_exhausted_marks_truncated() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            completion("a", 1, FinishReason::Length),
            completion("b", 1, FinishReason::Length),
            completion("c", 1, FinishReason::Length),
            completion("never reached", 1, FinishReason::Stop),
        ]));
        let executor = StageExecutor::new(provider.clone());

        let output = executor.run(Stage::Reviewer, "review", "sys", &[]).await.unwrap();
        assert_eq!(output.content, "a\n\nb\n\nc");
        assert!(output.truncated);
        // First call plus exactly two continuations.
        assert_eq!(provider.prompts.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_first_call_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![Err(PlanError::Generation(
            "provider down".into(),
        ))]));
        let executor = StageExecutor::new(provider);

        let result = executor.run(Stage::Researcher, "research", "sys", &[]).await;
        assert!(matches!(result, Err(PlanError::Generation(_))));
    }

    #[tokio::test]
    async fn test_continuation_error_keeps_partial_output() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            completion("partial", 5, FinishReason::Length),
            Err(PlanError::Generation("flaky".into())),
        ]));
        let executor = StageExecutor::new(provider);

        let output = executor.run(Stage::Planner, "plan", "sys", &[]).await.unwrap();
        assert_eq!(output.content, "partial");
        assert_eq!(output.tokens_used, 5);
        assert!(output.truncated);
    }

    #[test]
    fn test_continuation_tail_is_bounded() {
        let long = "x".repeat(CONTINUATION_TAIL_CHARS * 3);
        let prompt = build_continuation_prompt(&long);
        let replayed = prompt.matches('x').count();
        assert_eq!(replayed, CONTINUATION_TAIL_CHARS);
    }

    #[test]
    fn test_continuation_tail_char_boundary_safe() {
        let text = "é".repeat(CONTINUATION_TAIL_CHARS + 10);
        let prompt = build_continuation_prompt(&text);
        assert_eq!(prompt.matches('é').count(), CONTINUATION_TAIL_CHARS);
    }
}
