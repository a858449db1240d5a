//! JSON written at the end of a job.

use docveil_core::{JobResult, PipelineError};
use docveil_types::{ExtractedField, MatchResult, PipelineProgress, RedactionSelection};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
}

impl From<&PipelineError> for ErrorReport {
    fn from(e: &PipelineError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub page_index: usize,
    pub method: String,
    pub field_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport<'a> {
    pub document: Option<&'a str>,
    pub state: String,
    pub progress: &'a PipelineProgress,
    pub pages: Vec<PageReport>,
    pub fields: &'a [ExtractedField],
    pub matches: &'a [MatchResult],
    pub selection: &'a RedactionSelection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
    /// Redaction audit: drawn and logically-only entries plus verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redaction: Option<Value>,
}

impl<'a> JobReport<'a> {
    pub fn new(document: Option<&'a str>, result: &'a JobResult) -> Self {
        let mut warnings = Vec::new();
        if let Some(split) = &result.split_warning {
            warnings.push(format!("{}: {}", split.code(), split));
        }
        warnings.extend(result.page_failures.iter().map(|f| f.to_string()));

        let redaction = match (&result.artifact, &result.render_error) {
            (Some(artifact), _) => Some(serde_json::json!({
                "mime": artifact.mime.as_str(),
                "drawn": artifact.drawn(),
                "entries": artifact.entries,
                "verification": result.verification,
            })),
            (None, Some(e)) => Some(serde_json::json!({
                "error": { "code": e.code(), "message": e.to_string() },
            })),
            (None, None) => None,
        };

        Self {
            document,
            state: result.state.to_string(),
            progress: &result.progress,
            pages: result
                .pages
                .iter()
                .map(|p| PageReport {
                    page_index: p.page_index,
                    method: p.method.to_string(),
                    field_count: p.fields.len(),
                })
                .collect(),
            fields: &result.fields,
            matches: &result.matches,
            selection: &result.selection,
            warnings,
            error: result.error.as_ref().map(ErrorReport::from),
            redaction,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
