use docveil_pdf::PdfError;
use thiserror::Error;

/// Classification of a failed call to an extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    Unauthorized,
    RateLimited,
    UnsupportedFormat,
    Unknown,
}

impl ServiceErrorKind {
    /// Map an HTTP status to the nearest kind.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => ServiceErrorKind::Unauthorized,
            429 => ServiceErrorKind::RateLimited,
            415 | 422 => ServiceErrorKind::UnsupportedFormat,
            _ => ServiceErrorKind::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceErrorKind::Unauthorized => "unauthorized",
            ServiceErrorKind::RateLimited => "rate limited",
            ServiceErrorKind::UnsupportedFormat => "unsupported format",
            ServiceErrorKind::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("extraction service error ({}): {message}", kind.as_str())]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl ServiceError {
    pub fn new(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ServiceErrorKind::Unknown, message)
    }

    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ServiceErrorKind::RateLimited | ServiceErrorKind::Unknown
        )
    }
}

/// Failure of a single extraction tier.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Pdf(#[from] PdfError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("no text found on page")]
    Empty,
}

pub type Result<T> = std::result::Result<T, StrategyError>;
