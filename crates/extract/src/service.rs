//! Opaque extraction services and the tier that wraps them.

use std::sync::Arc;

use async_trait::async_trait;
use docveil_pdf::parse_key_values;
use docveil_types::{BoundingBox, ExtractedField, FieldSource, MimeType, PageDocument};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError, StrategyError};
use crate::strategy::{ExtractionMethod, ExtractionMode, ExtractionStrategy, PageExtraction};

/// A field as reported by a service. The box may use any accepted raw shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceField {
    pub label: String,
    pub value: String,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

fn full_confidence() -> f32 {
    1.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub fields: Vec<ServiceField>,
    #[serde(default)]
    pub page_count: Option<usize>,
}

/// Page bytes in, text and anchored fields out.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    fn name(&self) -> &str;

    async fn analyze(
        &self,
        bytes: &[u8],
        mime: &MimeType,
    ) -> std::result::Result<ServiceResponse, ServiceError>;
}

/// A remote tier: primary OCR or the secondary fallback endpoint.
pub struct RemoteStrategy {
    service: Arc<dyn ExtractionService>,
    method: ExtractionMethod,
}

impl RemoteStrategy {
    pub fn primary(service: Arc<dyn ExtractionService>) -> Self {
        Self {
            service,
            method: ExtractionMethod::RemoteOcr,
        }
    }

    pub fn fallback(service: Arc<dyn ExtractionService>) -> Self {
        Self {
            service,
            method: ExtractionMethod::FallbackRemote,
        }
    }

    fn id_prefix(&self) -> &'static str {
        match self.method {
            ExtractionMethod::FallbackRemote => "fallback",
            _ => "ocr",
        }
    }
}

#[async_trait]
impl ExtractionStrategy for RemoteStrategy {
    fn method(&self) -> ExtractionMethod {
        self.method
    }

    fn supports(&self, _mode: ExtractionMode) -> bool {
        true
    }

    async fn extract(&self, page: &PageDocument, _mode: ExtractionMode) -> Result<PageExtraction> {
        let response = self.service.analyze(&page.bytes, &page.mime).await?;

        let mut fields: Vec<ExtractedField> = response
            .fields
            .into_iter()
            .filter(|f| !f.label.trim().is_empty() && !f.value.trim().is_empty())
            .enumerate()
            .map(|(n, f)| {
                let field = ExtractedField::new(
                    format!("{}-{}-{}", self.id_prefix(), page.index, n),
                    f.label.trim(),
                    f.value.trim(),
                    page.index,
                    FieldSource::Ocr,
                )
                .with_confidence(f.confidence);
                match f.bounding_box {
                    Some(bbox) => field.with_box(bbox),
                    None => field,
                }
            })
            .collect();

        if fields.is_empty() {
            fields = parse_key_values(&response.text, page.index, FieldSource::Ocr);
        }
        if fields.is_empty() && response.text.trim().is_empty() {
            return Err(StrategyError::Empty);
        }

        log::info!(
            "[Extract] page {} via {} ({}): {} field(s)",
            page.index,
            self.method,
            self.service.name(),
            fields.len()
        );

        Ok(PageExtraction {
            page_index: page.index,
            text: response.text,
            fields,
            method: self.method,
        })
    }
}
