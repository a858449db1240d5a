//! Core orchestration for extraction and redaction jobs.

pub mod config;
pub mod error;
pub mod feedback;
pub mod pipeline;
pub mod selection;
pub mod state;

pub use config::{PipelineConfig, RedactionConfig, RemoteServiceConfig, ENV_PREFIX};
pub use error::{ConfigError, PipelineError};
pub use feedback::{report_feedback, Feedback, FeedbackSink, LoggingFeedbackSink};
pub use pipeline::{JobHandle, JobResult, Pipeline, PipelineJob, ProgressSender};
pub use selection::auto_select;
pub use state::PipelineState;

pub use docveil_extract::ExtractionMode;
pub use tokio_util::sync::CancellationToken;
