//! Fire-and-forget reporting of document type corrections.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub document_id: String,
    pub predicted_type: String,
    pub corrected_type: String,
}

#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn record(&self, feedback: &Feedback) -> Result<(), String>;
}

/// Writes feedback to the log and nowhere else.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingFeedbackSink;

#[async_trait]
impl FeedbackSink for LoggingFeedbackSink {
    async fn record(&self, feedback: &Feedback) -> Result<(), String> {
        log::info!(
            "[Feedback] document {}: predicted '{}', corrected to '{}'",
            feedback.document_id,
            feedback.predicted_type,
            feedback.corrected_type
        );
        Ok(())
    }
}

/// Send `feedback` on a spawned task. Failures are logged and go no further.
pub fn report_feedback(sink: Arc<dyn FeedbackSink>, feedback: Feedback) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = sink.record(&feedback).await {
            log::warn!(
                "[Feedback] failed to record feedback for {}: {}",
                feedback.document_id,
                e
            );
        }
    })
}
