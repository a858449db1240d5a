//! The extraction tier boundary.

use async_trait::async_trait;
use docveil_types::{ExtractedField, PageDocument};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which tier produced a page's extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    DirectParse,
    RemoteOcr,
    LayoutParse,
    FallbackRemote,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::DirectParse => "direct_parse",
            ExtractionMethod::RemoteOcr => "remote_ocr",
            ExtractionMethod::LayoutParse => "layout_parse",
            ExtractionMethod::FallbackRemote => "fallback_remote",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller wants out of a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    #[default]
    Auto,
    /// Plain text is enough.
    TextOnly,
    /// Structured key/value fields with geometry.
    Forms,
}

impl std::str::FromStr for ExtractionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(ExtractionMode::Auto),
            "text_only" | "text" => Ok(ExtractionMode::TextOnly),
            "forms" | "form" => Ok(ExtractionMode::Forms),
            other => Err(format!("unknown extraction mode '{}'", other)),
        }
    }
}

/// Successful extraction of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageExtraction {
    pub page_index: usize,
    pub text: String,
    pub fields: Vec<ExtractedField>,
    pub method: ExtractionMethod,
}

/// One tier of the fallback chain.
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    fn method(&self) -> ExtractionMethod;

    /// Tiers returning `false` are skipped for this mode, not counted as failed.
    fn supports(&self, mode: ExtractionMode) -> bool;

    async fn extract(&self, page: &PageDocument, mode: ExtractionMode) -> Result<PageExtraction>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse() {
        assert_eq!("auto".parse::<ExtractionMode>(), Ok(ExtractionMode::Auto));
        assert_eq!("Text-Only".parse::<ExtractionMode>(), Ok(ExtractionMode::TextOnly));
        assert_eq!("forms".parse::<ExtractionMode>(), Ok(ExtractionMode::Forms));
        assert!("ocr".parse::<ExtractionMode>().is_err());
    }
}
