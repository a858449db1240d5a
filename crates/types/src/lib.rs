//! Shared data model for the field-extraction and redaction pipeline.

pub mod bbox;
pub mod document;
pub mod element;
pub mod failure;
pub mod field;
pub mod matching;
pub mod progress;
pub mod selection;

pub use bbox::{BoundingBox, PixelRect, RawBoundingBox};
pub use document::{MimeType, PageDocument, SourceDocument};
pub use element::{ConfiguredDataElement, ElementAction};
pub use failure::FailureReason;
pub use field::{ExtractedField, FieldSource};
pub use matching::{MatchResult, MatchTier};
pub use progress::PipelineProgress;
pub use selection::{ManualRegion, RedactionSelection};

/// Shorten a value for logs so extracted PII never lands in clear text.
pub fn mask_snippet(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    if len <= 4 {
        "*".repeat(len)
    } else {
        let visible = 4.min(len / 3);
        let prefix: String = chars[..visible].iter().collect();
        let suffix: String = chars[len - visible..].iter().collect();
        format!("{}****{}", prefix, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_snippet() {
        assert_eq!(mask_snippet("abc"), "***");
        assert_eq!(mask_snippet("P1234567"), "P1****67");
        assert_eq!(mask_snippet("john.doe@example.com"), "john****.com");
    }
}
