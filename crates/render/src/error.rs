use docveil_pdf::PdfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// The source cannot be redacted in its own format.
    #[error("cannot redact {mime}: {detail}")]
    UnsupportedArtifact { mime: String, detail: String },

    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error("failed to encode {mime}: {detail}")]
    Encode { mime: String, detail: String },
}

impl RenderError {
    pub fn code(&self) -> &'static str {
        match self {
            RenderError::UnsupportedArtifact { .. } => "redaction_unsupported_artifact",
            RenderError::Pdf(_) => "redaction_pdf_error",
            RenderError::Encode { .. } => "redaction_encode_failed",
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;
