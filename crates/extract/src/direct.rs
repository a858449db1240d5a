//! Local tiers that read the PDF itself.

use async_trait::async_trait;
use docveil_pdf::{extract_page_text, layout_page_text, parse_key_values};
use docveil_types::{FieldSource, PageDocument};

use crate::error::{Result, StrategyError};
use crate::strategy::{ExtractionMethod, ExtractionMode, ExtractionStrategy, PageExtraction};

fn require_pdf(page: &PageDocument) -> Result<()> {
    if page.mime.is_pdf() {
        Ok(())
    } else {
        Err(StrategyError::UnsupportedFormat(page.mime.to_string()))
    }
}

fn finish(page: &PageDocument, text: String, method: ExtractionMethod) -> PageExtraction {
    let fields = parse_key_values(&text, page.index, FieldSource::DirectParse);
    log::info!(
        "[Extract] page {} via {}: {} chars, {} field(s)",
        page.index,
        method,
        text.len(),
        fields.len()
    );
    PageExtraction {
        page_index: page.index,
        text,
        fields,
        method,
    }
}

/// Reads the embedded text layer. Fields carry no geometry.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectParseStrategy;

#[async_trait]
impl ExtractionStrategy for DirectParseStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::DirectParse
    }

    fn supports(&self, mode: ExtractionMode) -> bool {
        mode != ExtractionMode::Forms
    }

    async fn extract(&self, page: &PageDocument, _mode: ExtractionMode) -> Result<PageExtraction> {
        require_pdf(page)?;
        let text = extract_page_text(&page.bytes)?;
        Ok(finish(page, text, self.method()))
    }
}

/// Rebuilds lines from the content stream when the text layer parse is unusable.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutParseStrategy;

#[async_trait]
impl ExtractionStrategy for LayoutParseStrategy {
    fn method(&self) -> ExtractionMethod {
        ExtractionMethod::LayoutParse
    }

    fn supports(&self, mode: ExtractionMode) -> bool {
        mode != ExtractionMode::Forms
    }

    async fn extract(&self, page: &PageDocument, _mode: ExtractionMode) -> Result<PageExtraction> {
        require_pdf(page)?;
        let text = layout_page_text(&page.bytes)?;
        Ok(finish(page, text, self.method()))
    }
}
