//! Burning a redaction selection into a copy of the source document.
//!
//! Selected fields with real geometry become filled opaque rectangles on their page.
//! Everything else is still reported as redacted, with a reason it was not drawn.

pub mod error;
mod plan;
mod raster;

use docveil_pdf::{redact_pdf, OverlayOptions, PdfError};
use docveil_types::{ExtractedField, MimeType, RedactionSelection, SourceDocument};

pub use error::{RenderError, Result};
pub use plan::{plan_redactions, regions_by_page, EntryOrigin, RedactionEntry, SkipReason};

#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// RGB fill of every rectangle.
    pub fill: [u8; 3],
    /// Blank PDF glyphs under the rectangles too.
    pub scrub_text: bool,
    pub producer: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            fill: [0, 0, 0],
            scrub_text: true,
            producer: None,
        }
    }
}

/// The redacted copy and what happened to every selected item.
#[derive(Debug, Clone)]
pub struct RedactedArtifact {
    pub bytes: Vec<u8>,
    pub mime: MimeType,
    pub entries: Vec<RedactionEntry>,
    pub fill: [u8; 3],
}

impl RedactedArtifact {
    pub fn drawn(&self) -> usize {
        self.entries.iter().filter(|e| e.visually_redacted).count()
    }

    /// Entries listed as redacted that have nothing drawn for them.
    pub fn logically_only(&self) -> impl Iterator<Item = &RedactionEntry> {
        self.entries.iter().filter(|e| !e.visually_redacted)
    }
}

/// Undecodable or encrypted PDFs cannot be redacted as PDFs at all.
fn pdf_failure(source: &SourceDocument, e: PdfError) -> RenderError {
    match e {
        PdfError::Malformed(_) | PdfError::Encrypted => RenderError::UnsupportedArtifact {
            mime: source.mime.to_string(),
            detail: e.to_string(),
        },
        other => RenderError::Pdf(other),
    }
}

fn pdf_page_count(source: &SourceDocument) -> Result<usize> {
    if let Some(count) = source.page_count() {
        return Ok(count);
    }
    let count = docveil_pdf::page_count(&source.bytes).map_err(|e| pdf_failure(source, e))?;
    Ok(source.page_count_or_init(|| count))
}

/// Redact `selection` into a new artifact in the source's own format.
///
/// `source` is never modified. Fails with [`RenderError::UnsupportedArtifact`] for mime types
/// that are neither PDF nor a decodable raster image.
pub fn render_redactions(
    source: &SourceDocument,
    selection: &RedactionSelection,
    fields: &[ExtractedField],
    options: &RenderOptions,
) -> Result<RedactedArtifact> {
    let bytes = match &source.mime {
        MimeType::Pdf => {
            let entries = plan_redactions(selection, fields, pdf_page_count(source)?);
            let overlay = OverlayOptions {
                fill: options.fill.map(|c| c as f32 / 255.0),
                scrub_text: options.scrub_text,
                producer: options
                    .producer
                    .clone()
                    .unwrap_or_else(|| OverlayOptions::default().producer),
            };
            let redacted = redact_pdf(&source.bytes, &regions_by_page(&entries), &overlay)
                .map_err(|e| pdf_failure(source, e))?;
            log::info!(
                "[Render] PDF: {} page(s) touched, {} text run(s) scrubbed",
                redacted.pages.len(),
                redacted.scrubbed_runs
            );
            return Ok(RedactedArtifact {
                bytes: redacted.bytes,
                mime: MimeType::Pdf,
                entries,
                fill: options.fill,
            });
        }
        mime if mime.is_raster() => &source.bytes,
        other => {
            return Err(RenderError::UnsupportedArtifact {
                mime: other.to_string(),
                detail: "only PDF and raster images can be redacted".to_string(),
            })
        }
    };

    let entries = plan_redactions(selection, fields, 1);
    let boxes: Vec<_> = regions_by_page(&entries)
        .remove(&0)
        .unwrap_or_default();
    let out = raster::redact_raster(bytes, &source.mime, &boxes, options.fill)?;

    Ok(RedactedArtifact {
        bytes: out,
        mime: source.mime.clone(),
        entries,
        fill: options.fill,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_pdf::fixtures::{PdfFixture, PAGE_HEIGHT};
    use docveil_types::{BoundingBox, FieldSource};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn selection(ids: &[&str]) -> RedactionSelection {
        let mut selection = RedactionSelection::default();
        for id in ids {
            selection.select(*id);
        }
        selection
    }

    #[test]
    fn test_pdf_redaction_by_field() {
        let bytes = PdfFixture::new()
            .page(&["Cover page"])
            .page(&["Passport Number: P1234567", "Nationality: Utopian"])
            .build()
            .unwrap();
        let source = SourceDocument::new(bytes.clone(), MimeType::Pdf);

        let top = (PAGE_HEIGHT - 735.0) as f64 / PAGE_HEIGHT as f64;
        let fields = vec![
            ExtractedField::new("ocr-1-0", "Passport Number", "P1234567", 1, FieldSource::Ocr)
                .with_box(BoundingBox::new(0.0, top, 1.0, 20.0 / PAGE_HEIGHT as f64)),
            ExtractedField::new("kv-1-1", "Nationality", "Utopian", 1, FieldSource::DirectParse),
        ];

        let artifact = render_redactions(
            &source,
            &selection(&["ocr-1-0", "kv-1-1"]),
            &fields,
            &RenderOptions::default(),
        )
        .unwrap();

        assert_eq!(source.bytes, bytes);
        assert_eq!(artifact.mime, MimeType::Pdf);
        assert_eq!(artifact.drawn(), 1);
        let skipped: Vec<&str> = artifact.logically_only().map(|e| e.id.as_str()).collect();
        assert_eq!(skipped, vec!["kv-1-1"]);

        let text = docveil_pdf::extract_page_text(&artifact.bytes).unwrap();
        assert!(!text.contains("P1234567"));
        assert!(text.contains("Cover page"));
        assert!(text.contains("Utopian"));
    }

    #[test]
    fn test_raster_full_page() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(20, 10, Rgb([255, 255, 255])));
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png).unwrap();
        let source = SourceDocument::new(png.into_inner(), MimeType::Png);

        let mut sel = RedactionSelection::default();
        sel.add_region(docveil_types::ManualRegion {
            id: "m1".into(),
            label: "Everything".into(),
            page_index: 0,
            bounding_box: BoundingBox::full_page(),
        });

        let artifact = render_redactions(&source, &sel, &[], &RenderOptions::default()).unwrap();
        let out = image::load_from_memory(&artifact.bytes).unwrap().to_rgb8();
        assert!(out.pixels().all(|p| *p == Rgb([0, 0, 0])));
        assert_eq!(artifact.mime, MimeType::Png);
    }

    #[test]
    fn test_unsupported_mime() {
        let source = SourceDocument::new(b"hello".to_vec(), MimeType::from("text/plain"));
        let err = render_redactions(
            &source,
            &RedactionSelection::default(),
            &[],
            &RenderOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedArtifact { .. }));
        assert_eq!(err.code(), "redaction_unsupported_artifact");
    }

    #[test]
    fn test_unreadable_pdf_is_unsupported() {
        let source = SourceDocument::new(b"%PDF-garbage".to_vec(), MimeType::Pdf);
        let err = render_redactions(
            &source,
            &selection(&["x"]),
            &[],
            &RenderOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "redaction_unsupported_artifact");
    }

    #[test]
    fn test_unreadable_pdf_with_cached_page_count() {
        let source = SourceDocument::new(b"%PDF-garbage".to_vec(), MimeType::Pdf);
        // the splitter caches one page for documents it could not split
        source.page_count_or_init(|| 1);
        let fields = vec![
            ExtractedField::new("ocr-0-0", "Surname", "Roe", 0, FieldSource::Ocr)
                .with_box(BoundingBox::new(0.1, 0.1, 0.2, 0.05)),
        ];

        let err = render_redactions(
            &source,
            &selection(&["ocr-0-0"]),
            &fields,
            &RenderOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedArtifact { .. }));
        assert_eq!(err.code(), "redaction_unsupported_artifact");
    }
}
