use std::time::Duration;

use docveil_extract::{Attempt, ExtractionFailure, ServiceError};
use docveil_types::FailureReason;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("page {page_index}: extraction failed ({reason})")]
    ExtractionFailed {
        page_index: usize,
        reason: FailureReason,
        attempts: Vec<Attempt>,
    },

    #[error("pipeline cancelled")]
    Cancelled,

    #[error("job timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("job task failed: {0}")]
    Join(String),
}

impl PipelineError {
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::ExtractionFailed { .. } => "extraction_failed",
            PipelineError::Cancelled => "pipeline_cancelled",
            PipelineError::TimedOut(_) => "timed_out",
            PipelineError::Join(_) => "join_failed",
        }
    }
}

impl From<ExtractionFailure> for PipelineError {
    fn from(failure: ExtractionFailure) -> Self {
        PipelineError::ExtractionFailed {
            page_index: failure.page_index,
            reason: failure.reason,
            attempts: failure.attempts,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_extract::ExtractionMethod;

    #[test]
    fn test_codes_and_messages() {
        let failure = ExtractionFailure {
            page_index: 2,
            reason: FailureReason::Corrupted,
            attempts: vec![Attempt {
                method: ExtractionMethod::DirectParse,
                error: "malformed PDF".into(),
            }],
        };
        let err = PipelineError::from(failure);
        assert_eq!(err.code(), "extraction_failed");
        assert_eq!(err.to_string(), "page 2: extraction failed (corrupted)");

        let timeout = PipelineError::TimedOut(Duration::from_secs(90));
        assert_eq!(timeout.code(), "timed_out");
        assert_eq!(timeout.to_string(), "job timed out after 90s");
    }
}
