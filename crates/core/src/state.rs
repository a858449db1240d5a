use serde::{Deserialize, Serialize};

/// Where a job is. `Done`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "page")]
pub enum PipelineState {
    #[default]
    Idle,
    Splitting,
    ExtractingPage(usize),
    Matching,
    PatternDetecting,
    Aggregating,
    Rendering,
    Done,
    Failed,
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::Failed | PipelineState::Cancelled
        )
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => f.write_str("idle"),
            PipelineState::Splitting => f.write_str("splitting"),
            PipelineState::ExtractingPage(i) => write!(f, "extracting page {}", i),
            PipelineState::Matching => f.write_str("matching"),
            PipelineState::PatternDetecting => f.write_str("pattern detecting"),
            PipelineState::Aggregating => f.write_str("aggregating"),
            PipelineState::Rendering => f.write_str("rendering"),
            PipelineState::Done => f.write_str("done"),
            PipelineState::Failed => f.write_str("failed"),
            PipelineState::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_terminal() {
        assert_eq!(PipelineState::ExtractingPage(3).to_string(), "extracting page 3");
        assert!(PipelineState::Cancelled.is_terminal());
        assert!(!PipelineState::Rendering.is_terminal());
        assert_eq!(
            serde_json::to_value(PipelineState::ExtractingPage(1)).unwrap(),
            serde_json::json!({"state": "extracting_page", "page": 1})
        );
    }
}
