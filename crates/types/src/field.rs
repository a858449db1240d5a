use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// Where an extracted field came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldSource {
    DirectParse,
    Ocr,
    Pattern,
    Manual,
}

/// A labeled value found on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    pub id: String,
    pub label: String,
    pub value: String,
    pub confidence: f32,
    pub page_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    pub source: FieldSource,
}

impl ExtractedField {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        value: impl Into<String>,
        page_index: usize,
        source: FieldSource,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            value: value.into(),
            confidence: 1.0,
            page_index,
            bounding_box: None,
            source,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn with_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// User correction of the raw label before finalization.
    pub fn relabel(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }

    /// True when the box describes where the value actually sits on the page.
    /// Pattern boxes are synthesized and do not count.
    pub fn has_real_geometry(&self) -> bool {
        self.source != FieldSource::Pattern
            && self.bounding_box.map(|b| !b.is_empty()).unwrap_or(false)
    }
}
