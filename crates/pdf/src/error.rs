use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdfError {
    /// lopdf could not parse the bytes.
    #[error("malformed PDF: {0}")]
    Malformed(String),

    #[error("document is encrypted")]
    Encrypted,

    #[error("page {0} not found")]
    PageNotFound(usize),

    #[error("page has no text layer")]
    NoTextLayer,

    #[error("content stream error: {0}")]
    Content(String),

    #[error("failed to write PDF: {0}")]
    Save(String),
}

pub type Result<T> = std::result::Result<T, PdfError>;

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Malformed(e.to_string())
    }
}

/// Non-fatal: the splitter fell back to a single page holding the whole document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("page split failed, document kept as a single page: {reason}")]
pub struct SplitFailed {
    pub reason: String,
}

impl SplitFailed {
    pub fn code(&self) -> &'static str {
        "split_failed"
    }
}
