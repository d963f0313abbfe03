//! Pipeline Coordinator
//!
//! Drives the strictly sequential research -> plan -> review pipeline.
//! Each stage's output is threaded into the next stage's prompt; a stage
//! failure marks the run Failed, records the error inside the run, and
//! stops the pipeline. Progress events fire at every stage boundary and
//! never affect the outcome.

use std::sync::Arc;
use tracing::{error, info, warn};

use crate::ai::executor::StageExecutor;
use crate::ai::provider::SharedProvider;
use crate::constants::progress::{PLAN_DONE, RESEARCH_DONE, RESEARCH_START, REVIEW_DONE};
use crate::constants::retrieval::{
    DEFAULT_SCORE_THRESHOLD, RESEARCH_CONTEXT_MAX_LENGTH, RESEARCH_TOP_K,
};
use crate::pipeline::progress::{emit, ProgressEvent, SharedSink, StageStatus};
use crate::pipeline::stages;
use crate::rag::{RagService, SearchOptions};
use crate::types::{PlanError, PipelineRun, Result, RunStatus, Stage, StageOutput, TaskRequest};

/// Retrieval and degradation knobs for one coordinator.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub rag_top_k: usize,
    pub rag_score_threshold: f32,
    pub context_max_length: usize,
    /// Restrict the researcher to the private corpus; an empty corpus is
    /// surfaced to the model as an explicit warning instead of silence
    pub corpus_only: bool,
    /// On retrieval failure, continue with no context instead of failing
    /// the run
    pub degrade_on_retrieval_error: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            rag_top_k: RESEARCH_TOP_K,
            rag_score_threshold: DEFAULT_SCORE_THRESHOLD,
            context_max_length: RESEARCH_CONTEXT_MAX_LENGTH,
            corpus_only: false,
            degrade_on_retrieval_error: false,
        }
    }
}

/// Coordinates the three-stage plan generation pipeline.
pub struct PipelineCoordinator {
    executor: StageExecutor,
    rag: Option<Arc<RagService>>,
    sink: SharedSink,
    options: PipelineOptions,
}

impl PipelineCoordinator {
    pub fn new(
        provider: SharedProvider,
        rag: Option<Arc<RagService>>,
        sink: SharedSink,
        options: PipelineOptions,
    ) -> Self {
        Self {
            executor: StageExecutor::new(provider),
            rag,
            sink,
            options,
        }
    }

    /// Run the full pipeline for a task.
    ///
    /// `rag_query` overrides the retrieval query derived from the task.
    /// The returned run is `Completed` with all three stage outputs, or
    /// `Failed` with the error recorded and the stages that did finish.
    /// Only a retrieval failure (without degradation enabled) surfaces as
    /// `Err` before any stage runs.
    pub async fn run(&self, task: TaskRequest, rag_query: Option<&str>) -> Result<PipelineRun> {
        let mut run = PipelineRun::new(task);
        run.transition(RunStatus::Running);
        info!(run_id = %run.id, title = %run.task.title, "pipeline started");

        let rag_context = self.retrieve_context(&run.task, rag_query).await?;

        // Research
        self.progress(Stage::Researcher, StageStatus::Started, RESEARCH_START)
            .await;
        let prompt =
            stages::build_research_prompt(&run.task, &rag_context, self.options.corpus_only);
        let research = match self
            .executor
            .run(Stage::Researcher, &prompt, stages::RESEARCHER_SYSTEM, &[])
            .await
        {
            Ok(output) => output,
            Err(e) => return Ok(self.fail(run, Stage::Researcher, e)),
        };
        run.stages.push(research);
        self.progress(Stage::Researcher, StageStatus::Completed, RESEARCH_DONE)
            .await;

        // Plan
        self.progress(Stage::Planner, StageStatus::Started, RESEARCH_DONE)
            .await;
        let research_content = run
            .stage_output(Stage::Researcher)
            .map(|s| s.content.clone())
            .unwrap_or_default();
        let prompt = stages::build_planning_prompt(&run.task, &research_content);
        let plan = match self
            .executor
            .run(Stage::Planner, &prompt, stages::PLANNER_SYSTEM, &[])
            .await
        {
            Ok(output) => output,
            Err(e) => return Ok(self.fail(run, Stage::Planner, e)),
        };
        run.stages.push(plan);
        self.progress(Stage::Planner, StageStatus::Completed, PLAN_DONE)
            .await;

        // Review
        self.progress(Stage::Reviewer, StageStatus::Started, PLAN_DONE)
            .await;
        let plan_content = run
            .stage_output(Stage::Planner)
            .map(|s| s.content.clone())
            .unwrap_or_default();
        let prompt = stages::build_review_prompt(&run.task, &research_content, &plan_content);
        let review = match self
            .executor
            .run(Stage::Reviewer, &prompt, stages::REVIEWER_SYSTEM, &[])
            .await
        {
            Ok(output) => output,
            Err(e) => return Ok(self.fail(run, Stage::Reviewer, e)),
        };
        run.stages.push(review);
        self.progress(Stage::Reviewer, StageStatus::Completed, REVIEW_DONE)
            .await;

        run.transition(RunStatus::Completed);
        info!(run_id = %run.id, "pipeline completed");
        Ok(run)
    }

    /// Re-run only the review stage to apply a requested change to an
    /// existing plan. No research or planning happens here.
    pub async fn modify(
        &self,
        task: &TaskRequest,
        original_plan: &str,
        modification_request: &str,
    ) -> Result<StageOutput> {
        info!(title = %task.title, "modifying existing plan");

        self.progress(Stage::Reviewer, StageStatus::Started, RESEARCH_START)
            .await;
        let prompt = stages::build_modification_prompt(task, original_plan, modification_request);
        let output = self
            .executor
            .run(Stage::Reviewer, &prompt, stages::REVIEWER_SYSTEM, &[])
            .await?;
        self.progress(Stage::Reviewer, StageStatus::Completed, REVIEW_DONE)
            .await;

        Ok(output)
    }

    async fn retrieve_context(&self, task: &TaskRequest, rag_query: Option<&str>) -> Result<String> {
        let Some(rag) = &self.rag else {
            return Ok(String::new());
        };

        let options = SearchOptions {
            top_k: self.options.rag_top_k,
            score_threshold: self.options.rag_score_threshold,
            user_id: task.user_id.clone(),
            file_ids: None,
        };

        let query = rag_query
            .map(str::to_string)
            .unwrap_or_else(|| stages::research_query(task));

        let hits = match rag.search(&query, &options).await {
            Ok(hits) => hits,
            Err(e) if self.options.degrade_on_retrieval_error => {
                warn!(error = %e, "retrieval failed, continuing without context");
                return Ok(String::new());
            }
            Err(e) => return Err(e),
        };

        if self.options.corpus_only && hits.is_empty() {
            warn!("corpus-only mode enabled but retrieval returned nothing");
            return Ok(stages::EMPTY_CORPUS_WARNING.to_string());
        }

        Ok(rag.build_context(&hits, self.options.context_max_length))
    }

    fn fail(&self, mut run: PipelineRun, stage: Stage, e: PlanError) -> PipelineRun {
        error!(run_id = %run.id, stage = %stage, error = %e, "pipeline failed");
        run.error = Some(PlanError::pipeline(stage.name(), e.to_string()).to_string());
        run.transition(RunStatus::Failed);
        run
    }

    async fn progress(&self, stage: Stage, status: StageStatus, percent: u8) {
        emit(&self.sink, ProgressEvent::new(stage, status, percent)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream::BoxStream;
    use std::sync::Mutex;

    use crate::ai::provider::{Completion, CompletionProvider, FinishReason, Message};
    use crate::pipeline::progress::{ChannelSink, NullSink};
    use crate::rag::{Chunker, DocumentInfo, EmbeddingGateway, MemoryIndex};

    /// Provider that answers each call with a payload derived from the
    /// prompt, or fails on a chosen call number.
    struct CountingProvider {
        calls: Mutex<u32>,
        fail_on_call: Option<u32>,
    }

    impl CountingProvider {
        fn new() -> Self {
            Self {
                calls: Mutex::new(0),
                fail_on_call: None,
            }
        }

        fn failing_on(call: u32) -> Self {
            Self {
                calls: Mutex::new(0),
                fail_on_call: Some(call),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for CountingProvider {
        async fn complete(
            &self,
            prompt: &str,
            _system: &str,
            _history: &[Message],
        ) -> Result<Completion> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            if Some(*calls) == self.fail_on_call {
                return Err(PlanError::Generation("scripted failure".into()));
            }
            Ok(Completion {
                content: format!("output for call {} ({} chars in)", *calls, prompt.len()),
                tokens_used: 10,
                finish_reason: FinishReason::Stop,
            })
        }

        async fn complete_stream(
            &self,
            _prompt: &str,
            _system: &str,
            _history: &[Message],
        ) -> Result<BoxStream<'static, Result<String>>> {
            Err(PlanError::Generation("not used".into()))
        }

        fn name(&self) -> &str {
            "counting"
        }

        fn model(&self) -> &str {
            "counting-1"
        }
    }

    fn task() -> TaskRequest {
        TaskRequest {
            title: "Ship the feature".to_string(),
            description: "Two week sprint".to_string(),
            task_type: "project".to_string(),
            user_id: None,
        }
    }

    fn coordinator(provider: CountingProvider, options: PipelineOptions) -> PipelineCoordinator {
        PipelineCoordinator::new(Arc::new(provider), None, Arc::new(NullSink), options)
    }

    #[tokio::test]
    async fn test_full_run_produces_three_stages_in_order() {
        let coord = coordinator(CountingProvider::new(), PipelineOptions::default());
        let run = coord.run(task(), None).await.unwrap();

        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.error.is_none());
        assert!(run.finished_at.is_some());
        let stages: Vec<Stage> = run.stages.iter().map(|s| s.stage).collect();
        assert_eq!(stages, [Stage::Researcher, Stage::Planner, Stage::Reviewer]);
    }

    #[tokio::test]
    async fn test_stage_failure_short_circuits() {
        // Second completion call is the planner.
        let coord = coordinator(CountingProvider::failing_on(2), PipelineOptions::default());
        let run = coord.run(task(), None).await.unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.error.as_deref().unwrap_or("").contains("planner"));
        // Researcher finished, reviewer never ran.
        assert_eq!(run.stages.len(), 1);
        assert_eq!(run.stages[0].stage, Stage::Researcher);
    }

    #[tokio::test]
    async fn test_progress_milestones() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(16);
        let coord = PipelineCoordinator::new(
            Arc::new(CountingProvider::new()),
            None,
            Arc::new(ChannelSink::new(tx)),
            PipelineOptions::default(),
        );
        coord.run(task(), None).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push((event.stage, event.status, event.percent));
        }
        assert_eq!(
            events,
            vec![
                (Stage::Researcher, StageStatus::Started, 0),
                (Stage::Researcher, StageStatus::Completed, 33),
                (Stage::Planner, StageStatus::Started, 33),
                (Stage::Planner, StageStatus::Completed, 66),
                (Stage::Reviewer, StageStatus::Started, 66),
                (Stage::Reviewer, StageStatus::Completed, 100),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_sink_does_not_fail_run() {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        let coord = PipelineCoordinator::new(
            Arc::new(CountingProvider::new()),
            None,
            Arc::new(ChannelSink::new(tx)),
            PipelineOptions::default(),
        );

        let run = coord.run(task(), None).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_modify_runs_single_stage() {
        let provider = CountingProvider::new();
        let coord = coordinator(provider, PipelineOptions::default());

        let output = coord
            .modify(&task(), "old plan", "shorter please")
            .await
            .unwrap();
        assert_eq!(output.stage, Stage::Reviewer);
        assert!(output.content.contains("call 1"));
    }

    #[tokio::test]
    async fn test_modify_error_propagates() {
        let coord = coordinator(CountingProvider::failing_on(1), PipelineOptions::default());
        let result = coord.modify(&task(), "old plan", "change").await;
        assert!(result.is_err());
    }

    // Retrieval wiring against a live in-memory index.

    struct FailingGateway;

    #[async_trait]
    impl EmbeddingGateway for FailingGateway {
        async fn encode(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Err(PlanError::Retrieval("embedding service down".into()))
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    struct UnitGateway;

    #[async_trait]
    impl EmbeddingGateway for UnitGateway {
        async fn encode(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0, 0.0]).collect())
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    fn rag(gateway: impl EmbeddingGateway + 'static) -> Arc<RagService> {
        Arc::new(RagService::new(
            Arc::new(gateway),
            Arc::new(MemoryIndex::new(4)),
            Chunker::new(100, 0).unwrap(),
        ))
    }

    #[tokio::test]
    async fn test_retrieval_failure_propagates_by_default() {
        let coord = PipelineCoordinator::new(
            Arc::new(CountingProvider::new()),
            Some(rag(FailingGateway)),
            Arc::new(NullSink),
            PipelineOptions::default(),
        );

        let result = coord.run(task(), None).await;
        assert!(matches!(result, Err(PlanError::Retrieval(_))));
    }

    #[tokio::test]
    async fn test_retrieval_failure_degrades_when_enabled() {
        let options = PipelineOptions {
            degrade_on_retrieval_error: true,
            ..Default::default()
        };
        let coord = PipelineCoordinator::new(
            Arc::new(CountingProvider::new()),
            Some(rag(FailingGateway)),
            Arc::new(NullSink),
            options,
        );

        let run = coord.run(task(), None).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_corpus_only_empty_corpus_warns_model() {
        let options = PipelineOptions {
            corpus_only: true,
            ..Default::default()
        };
        let svc = rag(UnitGateway);
        let coord = PipelineCoordinator::new(
            Arc::new(CountingProvider::new()),
            Some(svc),
            Arc::new(NullSink),
            options,
        );

        let context = coord.retrieve_context(&task(), None).await.unwrap();
        assert_eq!(context, stages::EMPTY_CORPUS_WARNING);
    }

    #[tokio::test]
    async fn test_indexed_corpus_feeds_context() {
        let svc = rag(UnitGateway);
        svc.index_text(
            "sprint planning requires clear scope and daily standups",
            DocumentInfo {
                file_id: "f1".to_string(),
                filename: "process.md".to_string(),
                file_type: ".md".to_string(),
                user_id: None,
            },
        )
        .await
        .unwrap();

        let coord = PipelineCoordinator::new(
            Arc::new(CountingProvider::new()),
            Some(svc),
            Arc::new(NullSink),
            PipelineOptions::default(),
        );

        let context = coord.retrieve_context(&task(), None).await.unwrap();
        assert!(context.contains("process.md"));
        assert!(context.contains("sprint planning"));
    }
}
