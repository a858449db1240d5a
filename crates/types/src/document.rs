use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

/// Content type of a document or page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MimeType {
    Pdf,
    Png,
    Jpeg,
    Tiff,
    Other(String),
}

impl MimeType {
    pub fn as_str(&self) -> &str {
        match self {
            MimeType::Pdf => "application/pdf",
            MimeType::Png => "image/png",
            MimeType::Jpeg => "image/jpeg",
            MimeType::Tiff => "image/tiff",
            MimeType::Other(raw) => raw,
        }
    }

    pub fn is_pdf(&self) -> bool {
        matches!(self, MimeType::Pdf)
    }

    pub fn is_raster(&self) -> bool {
        matches!(self, MimeType::Png | MimeType::Jpeg | MimeType::Tiff)
    }

    /// Guess from a file extension, falling back to `Other`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => MimeType::Pdf,
            "png" => MimeType::Png,
            "jpg" | "jpeg" => MimeType::Jpeg,
            "tif" | "tiff" => MimeType::Tiff,
            other => MimeType::Other(format!("application/x-{}", other)),
        }
    }
}

impl From<&str> for MimeType {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => MimeType::Pdf,
            "image/png" => MimeType::Png,
            "image/jpeg" | "image/jpg" => MimeType::Jpeg,
            "image/tiff" => MimeType::Tiff,
            _ => MimeType::Other(raw.to_string()),
        }
    }
}

impl From<String> for MimeType {
    fn from(raw: String) -> Self {
        MimeType::from(raw.as_str())
    }
}

impl From<MimeType> for String {
    fn from(mime: MimeType) -> Self {
        mime.as_str().to_string()
    }
}

impl std::fmt::Display for MimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded document.
///
/// The page count is resolved lazily by whoever first needs it and cached for the lifetime of
/// the document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub bytes: Vec<u8>,
    pub mime: MimeType,
    pub name: Option<String>,
    page_count: OnceCell<usize>,
}

impl SourceDocument {
    pub fn new(bytes: Vec<u8>, mime: MimeType) -> Self {
        Self {
            bytes,
            mime,
            name: None,
            page_count: OnceCell::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Cached page count, if already resolved.
    pub fn page_count(&self) -> Option<usize> {
        self.page_count.get().copied()
    }

    /// Resolve the page count once; later calls return the cached value.
    pub fn page_count_or_init<F>(&self, resolve: F) -> usize
    where
        F: FnOnce() -> usize,
    {
        *self.page_count.get_or_init(resolve)
    }
}

/// Single-page derivative of a [`SourceDocument`].
#[derive(Debug, Clone, PartialEq)]
pub struct PageDocument {
    /// 0-based, stable page index.
    pub index: usize,
    pub mime: MimeType,
    pub bytes: Vec<u8>,
}

impl PageDocument {
    pub fn new(index: usize, mime: MimeType, bytes: Vec<u8>) -> Self {
        Self { index, mime, bytes }
    }
}
