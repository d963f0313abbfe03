//! Progress Reporting
//!
//! Fire-and-forget progress events emitted at stage boundaries. A failing
//! sink must never fail the pipeline: errors are logged and dropped.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::types::Stage;

/// Stage lifecycle moment a progress event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Started,
    Completed,
}

/// One progress update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub status: StageStatus,
    /// Overall pipeline progress, 0 to 100
    pub percent: u8,
}

impl ProgressEvent {
    pub fn new(stage: Stage, status: StageStatus, percent: u8) -> Self {
        Self {
            stage,
            status,
            percent,
        }
    }
}

/// Receives progress events from the coordinator.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn notify(&self, event: ProgressEvent) -> Result<(), String>;
}

/// Shared sink handle.
pub type SharedSink = Arc<dyn ProgressSink>;

/// Emit an event and swallow any sink failure.
pub(crate) async fn emit(sink: &SharedSink, event: ProgressEvent) {
    if let Err(e) = sink.notify(event.clone()).await {
        warn!(stage = %event.stage, error = %e, "progress sink failed, continuing");
    }
}

/// Sink that discards every event.
pub struct NullSink;

#[async_trait]
impl ProgressSink for NullSink {
    async fn notify(&self, _event: ProgressEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Sink forwarding events over an mpsc channel, e.g. to a websocket task.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::Sender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: tokio::sync::mpsc::Sender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ProgressSink for ChannelSink {
    async fn notify(&self, event: ProgressEvent) -> Result<(), String> {
        self.tx
            .send(event)
            .await
            .map_err(|e| format!("progress channel closed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_delivers_events() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(4);
        let sink: SharedSink = Arc::new(ChannelSink::new(tx));

        emit(
            &sink,
            ProgressEvent::new(Stage::Researcher, StageStatus::Started, 0),
        )
        .await;

        let event = rx.recv().await.unwrap();
        assert_eq!(event.stage, Stage::Researcher);
        assert_eq!(event.status, StageStatus::Started);
        assert_eq!(event.percent, 0);
    }

    #[tokio::test]
    async fn test_closed_channel_is_swallowed() {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        let sink: SharedSink = Arc::new(ChannelSink::new(tx));

        // Must not panic or error out.
        emit(
            &sink,
            ProgressEvent::new(Stage::Planner, StageStatus::Completed, 66),
        )
        .await;
    }

    #[test]
    fn test_event_serialization_shape() {
        let event = ProgressEvent::new(Stage::Reviewer, StageStatus::Completed, 100);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["percent"], 100);
    }
}
