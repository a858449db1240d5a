use serde::{Deserialize, Serialize};

/// Why a page could not be extracted by any tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Encrypted,
    Corrupted,
    UnsupportedFormat,
    Unknown,
}

impl FailureReason {
    /// Classify raw error text by known substrings. `None` when nothing is recognized.
    pub fn classify(message: &str) -> Option<Self> {
        let lower = message.to_lowercase();
        if lower.contains("encrypt") || lower.contains("password") {
            Some(FailureReason::Encrypted)
        } else if lower.contains("corrupt")
            || lower.contains("xref")
            || lower.contains("malformed")
            || lower.contains("unexpected eof")
            || lower.contains("invalid file header")
        {
            Some(FailureReason::Corrupted)
        } else if lower.contains("unsupported") || lower.contains("unknown format") {
            Some(FailureReason::UnsupportedFormat)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::Encrypted => "encrypted",
            FailureReason::Corrupted => "corrupted",
            FailureReason::UnsupportedFormat => "unsupported_format",
            FailureReason::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(
            FailureReason::classify("document is Encrypted"),
            Some(FailureReason::Encrypted)
        );
        assert_eq!(
            FailureReason::classify("invalid xref table"),
            Some(FailureReason::Corrupted)
        );
        assert_eq!(
            FailureReason::classify("Unsupported media type image/bmp"),
            Some(FailureReason::UnsupportedFormat)
        );
        assert_eq!(FailureReason::classify("connection reset"), None);
    }
}
