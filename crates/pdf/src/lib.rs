//! PDF primitives: page splitting, text-layer parsing, geometry and redaction burn-in.

mod content;
mod cursor;
pub mod error;
pub mod geometry;
pub mod redact;
pub mod split;
pub mod text;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use error::{PdfError, Result, SplitFailed};
pub use geometry::{PageGeometry, PdfRect};
pub use redact::{redact_pdf, set_redaction_metadata, OverlayOptions, RedactedPdf};
pub use split::{page_count, split_pages, SplitOutcome};
pub use text::{extract_page_text, layout_page_text, layout_text, parse_key_values};
