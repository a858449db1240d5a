use serde::{Deserialize, Serialize};

use crate::element::ConfiguredDataElement;
use crate::field::ExtractedField;

/// Matcher tier that produced a match, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    ExactName,
    MappingTable,
    Alias,
    FuzzySubstring,
}

/// Outcome for one extracted field, or a placeholder for an element nobody matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub field: Option<ExtractedField>,
    pub element: Option<ConfiguredDataElement>,
    pub tier: Option<MatchTier>,
    pub missing: bool,
}

impl MatchResult {
    pub fn matched(field: ExtractedField, element: ConfiguredDataElement, tier: MatchTier) -> Self {
        Self {
            field: Some(field),
            element: Some(element),
            tier: Some(tier),
            missing: false,
        }
    }

    pub fn unmatched(field: ExtractedField) -> Self {
        Self {
            field: Some(field),
            element: None,
            tier: None,
            missing: false,
        }
    }

    pub fn placeholder(element: ConfiguredDataElement) -> Self {
        Self {
            field: None,
            element: Some(element),
            tier: None,
            missing: true,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.element.is_some()
    }

    /// Extracted text; empty for placeholders.
    pub fn value(&self) -> &str {
        self.field.as_ref().map(|f| f.value.as_str()).unwrap_or("")
    }

    /// Extraction confidence; 0 for placeholders.
    pub fn confidence(&self) -> f32 {
        self.field.as_ref().map(|f| f.confidence).unwrap_or(0.0)
    }
}
