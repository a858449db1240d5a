//! Post-render checks on a redacted artifact.

use std::collections::HashMap;

use docveil_pdf::{extract_page_text, PdfError};
use docveil_render::{EntryOrigin, RedactedArtifact};
use docveil_types::{mask_snippet, ExtractedField, MimeType};
use image::GenericImageView;
use serde::{Deserialize, Serialize};

/// Per-channel slack for lossy formats.
const JPEG_TOLERANCE: u8 = 24;
/// Values shorter than this are too likely to occur elsewhere on the page.
const MIN_SEARCH_CHARS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyOptions {
    /// Search PDF artifacts for values that should have been blanked.
    pub text_search: bool,
    /// Check that raster boxes are fully painted.
    pub pixel_check: bool,
}

impl Default for VerifyOptions {
    fn default() -> Self {
        Self {
            text_search: true,
            pixel_check: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResult {
    pub ok: bool,
    pub warnings: Vec<String>,
    pub failures: Vec<String>,
}

fn residual_text(artifact: &RedactedArtifact, fields: &[ExtractedField]) -> Vec<String> {
    let text = match extract_page_text(&artifact.bytes) {
        Ok(text) => text,
        Err(PdfError::NoTextLayer) => return Vec::new(),
        Err(e) => return vec![format!("artifact could not be read back: {}", e)],
    };
    let by_id: HashMap<&str, &ExtractedField> =
        fields.iter().map(|f| (f.id.as_str(), f)).collect();

    artifact
        .entries
        .iter()
        .filter(|e| e.visually_redacted && e.origin == EntryOrigin::Field)
        .filter_map(|e| by_id.get(e.id.as_str()).map(|f| (e, *f)))
        .filter(|(_, f)| f.value.trim().chars().count() >= MIN_SEARCH_CHARS)
        .filter(|(_, f)| text.contains(f.value.trim()))
        .map(|(e, f)| {
            format!(
                "text of {} '{}' still present: {}",
                e.id,
                e.label,
                mask_snippet(f.value.trim())
            )
        })
        .collect()
}

fn close(a: u8, b: u8, tolerance: u8) -> bool {
    a.abs_diff(b) <= tolerance
}

fn unpainted_boxes(artifact: &RedactedArtifact) -> Vec<String> {
    let image = match image::load_from_memory(&artifact.bytes) {
        Ok(image) => image,
        Err(e) => return vec![format!("artifact could not be decoded: {}", e)],
    };
    let tolerance = if artifact.mime == MimeType::Jpeg {
        JPEG_TOLERANCE
    } else {
        0
    };
    let (width, height) = image.dimensions();
    let fill = artifact.fill;

    let mut failures = Vec::new();
    for entry in artifact.entries.iter().filter(|e| e.visually_redacted) {
        let Some(bbox) = entry.bounding_box else {
            continue;
        };
        let px = bbox.to_pixels(width, height);
        let uncovered = (px.y..px.y + px.height)
            .flat_map(|y| (px.x..px.x + px.width).map(move |x| (x, y)))
            .filter(|&(x, y)| {
                let p = image.get_pixel(x, y).0;
                p[3] != 255 || (0..3).any(|c| !close(p[c], fill[c], tolerance))
            })
            .count();
        if uncovered > 0 {
            failures.push(format!(
                "box for {} '{}' has {} unpainted pixel(s)",
                entry.id, entry.label, uncovered
            ));
        }
    }
    failures
}

/// Check `artifact` against the fields it was rendered from.
///
/// Entries that are listed as redacted but were never drawn produce warnings, not failures.
pub fn verify_artifact(
    artifact: &RedactedArtifact,
    fields: &[ExtractedField],
    options: &VerifyOptions,
) -> VerifyResult {
    let warnings: Vec<String> = artifact
        .logically_only()
        .map(|e| {
            format!(
                "{} '{}' is redacted in the report only ({})",
                e.id,
                e.label,
                e.skip_reason.map(|r| r.as_str()).unwrap_or("not drawn")
            )
        })
        .collect();

    let mut failures = Vec::new();
    if artifact.mime.is_pdf() && options.text_search {
        failures.extend(residual_text(artifact, fields));
    }
    if artifact.mime.is_raster() && options.pixel_check {
        failures.extend(unpainted_boxes(artifact));
    }

    for failure in &failures {
        log::warn!("[Verify] {}", failure);
    }
    log::info!(
        "[Verify] {} failure(s), {} warning(s)",
        failures.len(),
        warnings.len()
    );

    VerifyResult {
        ok: failures.is_empty(),
        warnings,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_pdf::fixtures::PdfFixture;
    use docveil_render::{render_redactions, RedactionEntry, RenderOptions, SkipReason};
    use docveil_types::{BoundingBox, FieldSource, RedactionSelection, SourceDocument};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn entry(id: &str, bbox: BoundingBox) -> RedactionEntry {
        RedactionEntry {
            id: id.to_string(),
            label: id.to_string(),
            origin: EntryOrigin::Manual,
            page_index: Some(0),
            bounding_box: Some(bbox),
            visually_redacted: true,
            skip_reason: None,
        }
    }

    #[test]
    fn test_rendered_raster_passes() {
        let source = SourceDocument::new(png(50, 50), MimeType::Png);
        let field = ExtractedField::new("ocr-0-0", "Name", "Jane Roe", 0, FieldSource::Ocr)
            .with_box(BoundingBox::new(0.2, 0.2, 0.4, 0.2));
        let mut selection = RedactionSelection::default();
        selection.select("ocr-0-0");
        selection.select("missing-dob");

        let artifact =
            render_redactions(&source, &selection, &[field.clone()], &RenderOptions::default())
                .unwrap();
        let result = verify_artifact(&artifact, &[field], &VerifyOptions::default());

        assert!(result.ok, "{:?}", result.failures);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("missing-dob"));
        assert!(result.warnings[0].contains(SkipReason::Missing.as_str()));
    }

    #[test]
    fn test_unpainted_box_fails() {
        let artifact = RedactedArtifact {
            bytes: png(10, 10),
            mime: MimeType::Png,
            entries: vec![entry("m1", BoundingBox::new(0.0, 0.0, 0.5, 0.5))],
            fill: [0, 0, 0],
        };
        let result = verify_artifact(&artifact, &[], &VerifyOptions::default());
        assert!(!result.ok);
        assert!(result.failures[0].contains("25 unpainted"));
    }

    #[test]
    fn test_residual_pdf_text_fails() {
        let bytes = PdfFixture::new().page(&["Passport Number: P1234567"]).build().unwrap();
        let field = ExtractedField::new("ocr-0-0", "Passport Number", "P1234567", 0, FieldSource::Ocr)
            .with_box(BoundingBox::new(0.0, 0.0, 0.1, 0.1));
        let mut drawn = entry("ocr-0-0", BoundingBox::new(0.0, 0.0, 0.1, 0.1));
        drawn.origin = EntryOrigin::Field;

        // box far from the text, so nothing was scrubbed
        let artifact = RedactedArtifact {
            bytes,
            mime: MimeType::Pdf,
            entries: vec![drawn],
            fill: [0, 0, 0],
        };
        let result = verify_artifact(&artifact, &[field], &VerifyOptions::default());
        assert!(!result.ok);
        assert!(result.failures[0].contains("still present"));
        assert!(!result.failures[0].contains("P1234567"));

        let relaxed = VerifyOptions {
            text_search: false,
            ..VerifyOptions::default()
        };
        assert!(verify_artifact(&artifact, &[], &relaxed).ok);
    }
}
