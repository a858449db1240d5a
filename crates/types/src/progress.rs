use serde::{Deserialize, Serialize};

/// Snapshot pushed to the caller while a job runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineProgress {
    pub status: String,
    pub processed_pages: usize,
    pub total_pages: usize,
    pub cancelled: bool,
}

impl PipelineProgress {
    pub fn new(status: impl Into<String>, processed_pages: usize, total_pages: usize) -> Self {
        Self {
            status: status.into(),
            processed_pages,
            total_pages,
            cancelled: false,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_pages > 0 && self.processed_pages >= self.total_pages
    }
}
