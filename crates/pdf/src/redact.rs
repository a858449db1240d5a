//! Burning opaque rectangles into PDF pages.
//!
//! Each affected page gets its text-showing operators scrubbed under the rectangles (glyphs
//! replaced by spaces so the text can no longer be copied) and an opaque fill drawn on top.

use std::collections::BTreeMap;

use docveil_types::BoundingBox;
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, StringFormat};

use crate::content::{get_page_content, page_id, replace_page_content};
use crate::cursor::{glyph_advance, TextCursor};
use crate::error::{PdfError, Result};
use crate::geometry::{PageGeometry, PdfRect};

/// Slack around each rectangle when deciding whether a glyph is covered, in points.
const GLYPH_MARGIN: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct OverlayOptions {
    /// Fill color, RGB components in `[0, 1]`.
    pub fill: [f32; 3],
    pub scrub_text: bool,
    /// Written to the `Producer` entry of the document info.
    pub producer: String,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            fill: [0.0, 0.0, 0.0],
            scrub_text: true,
            producer: format!("docveil {}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedactedPdf {
    pub bytes: Vec<u8>,
    /// Pages that received at least one rectangle, in page order.
    pub pages: Vec<usize>,
    /// Text runs whose glyphs were blanked.
    pub scrubbed_runs: usize,
}

fn scrub_bytes(
    bytes: &[u8],
    start_x: f32,
    y: f32,
    size: f32,
    scale: f32,
    rects: &[PdfRect],
) -> (Vec<u8>, bool, f32) {
    let glyph_height = (size * scale).max(1.0);
    let mut out = Vec::with_capacity(bytes.len());
    let mut x = start_x;
    let mut advance = 0.0;
    let mut any = false;

    for &byte in bytes {
        let width = glyph_advance(byte) * size;
        let covered = rects
            .iter()
            .any(|r| r.touches_glyph(x, y, width * scale, glyph_height, GLYPH_MARGIN));
        if covered && byte != b' ' {
            out.push(b' ');
            any = true;
        } else {
            out.push(byte);
        }
        x += width * scale;
        advance += width;
    }

    (out, any, advance)
}

/// Blank every glyph of a text-showing operator that falls under one of `rects`.
/// Returns the rewritten content and the number of runs touched.
pub(crate) fn scrub_text(content_data: &[u8], rects: &[PdfRect]) -> Result<(Vec<u8>, usize)> {
    let content = Content::decode(content_data).map_err(|e| PdfError::Content(e.to_string()))?;
    let mut cursor = TextCursor::new();
    let mut operations = Vec::with_capacity(content.operations.len());
    let mut scrubbed = 0;

    for mut op in content.operations {
        let string_slot = match op.operator.as_str() {
            "Tj" | "TJ" if cursor.in_text() => Some(0),
            "'" if cursor.in_text() => {
                cursor.next_line();
                Some(0)
            }
            "\"" if cursor.in_text() => {
                cursor.next_line();
                Some(2)
            }
            _ => None,
        };

        let Some(slot) = string_slot else {
            cursor.apply(&op);
            operations.push(op);
            continue;
        };

        let size = cursor.font_size();
        let scale = cursor.scale();
        let (x, y) = cursor.origin();
        let mut touched = false;
        let mut advance = 0.0;

        match op.operands.get_mut(slot) {
            Some(Object::String(bytes, _)) => {
                let (out, any, adv) = scrub_bytes(bytes, x, y, size, scale, rects);
                *bytes = out;
                touched = any;
                advance = adv;
            }
            Some(Object::Array(items)) => {
                for item in items.iter_mut() {
                    match item {
                        Object::String(bytes, _) => {
                            let (out, any, adv) =
                                scrub_bytes(bytes, x + advance * scale, y, size, scale, rects);
                            *bytes = out;
                            touched |= any;
                            advance += adv;
                        }
                        Object::Integer(_) | Object::Real(_) => {
                            let n = crate::content::get_number(item).unwrap_or(0.0);
                            advance -= n / 1000.0 * size;
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }

        if touched {
            scrubbed += 1;
        }
        cursor.advance(advance);
        operations.push(op);
    }

    let data = Content { operations }
        .encode()
        .map_err(|e| PdfError::Content(e.to_string()))?;
    Ok((data, scrubbed))
}

/// Wrap the existing content in `q ... Q` and paint `rects` above it in `fill`.
pub(crate) fn burn_overlay(content_data: &[u8], rects: &[PdfRect], fill: [f32; 3]) -> Result<Vec<u8>> {
    let content = Content::decode(content_data).map_err(|e| PdfError::Content(e.to_string()))?;
    let color = || fill.iter().map(|c| Object::Real(c.clamp(0.0, 1.0))).collect::<Vec<_>>();

    let mut operations = Vec::with_capacity(content.operations.len() + rects.len() * 2 + 6);
    operations.push(Operation::new("q", vec![]));
    operations.extend(content.operations);
    operations.push(Operation::new("Q", vec![]));

    operations.push(Operation::new("q", vec![]));
    operations.push(Operation::new("rg", color()));
    operations.push(Operation::new("RG", color()));
    for rect in rects {
        log::debug!(
            "[Overlay] x={:.1} y={:.1} w={:.1} h={:.1}",
            rect.x,
            rect.y,
            rect.width,
            rect.height
        );
        operations.push(Operation::new(
            "re",
            vec![
                Object::Real(rect.x),
                Object::Real(rect.y),
                Object::Real(rect.width),
                Object::Real(rect.height),
            ],
        ));
        operations.push(Operation::new("f", vec![]));
    }
    operations.push(Operation::new("Q", vec![]));

    Content { operations }
        .encode()
        .map_err(|e| PdfError::Content(e.to_string()))
}

fn literal(text: &str) -> Object {
    Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
}

/// Stamp `Producer`, `ModDate` and a redaction marker into the document info.
pub fn set_redaction_metadata(doc: &mut Document, producer: &str) -> Result<()> {
    let info_id = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => *id,
        _ => {
            let id = doc.add_object(Object::Dictionary(lopdf::Dictionary::new()));
            doc.trailer.set("Info", Object::Reference(id));
            id
        }
    };

    let now = chrono::Local::now();
    let pdf_date = format!("D:{}", now.format("%Y%m%d%H%M%S%z"));

    match doc.get_object_mut(info_id) {
        Ok(Object::Dictionary(info)) => {
            info.set("Producer", literal(producer));
            info.set("ModDate", literal(&pdf_date));
            info.set("Redacted", literal("true"));
        }
        _ => {
            return Err(PdfError::Content(format!(
                "info object {:?} is not a dictionary",
                info_id
            )))
        }
    }

    log::info!("[Overlay] metadata stamped: Producer={}, ModDate={}", producer, pdf_date);
    Ok(())
}

/// Burn `regions` (normalized boxes keyed by 0-based page index) into a copy of `bytes`.
///
/// Pages are processed in page order. The input is never modified.
pub fn redact_pdf(
    bytes: &[u8],
    regions: &BTreeMap<usize, Vec<BoundingBox>>,
    options: &OverlayOptions,
) -> Result<RedactedPdf> {
    let mut doc = Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        return Err(PdfError::Encrypted);
    }

    let mut pages = Vec::new();
    let mut scrubbed_runs = 0;

    for (&index, boxes) in regions {
        if boxes.is_empty() {
            continue;
        }
        let page = page_id(&doc, index)?;
        let geometry = PageGeometry::of_page(&doc, page);
        let rects: Vec<PdfRect> = boxes.iter().map(|b| geometry.to_pdf_rect(b)).collect();

        let mut data = get_page_content(&doc, page)?;
        if options.scrub_text {
            let (scrubbed, runs) = scrub_text(&data, &rects)?;
            data = scrubbed;
            scrubbed_runs += runs;
        }
        let data = burn_overlay(&data, &rects, options.fill)?;
        replace_page_content(&mut doc, page, data)?;

        log::info!("[Overlay] page {}: {} rectangle(s)", index, rects.len());
        pages.push(index);
    }

    set_redaction_metadata(&mut doc, &options.producer)?;
    doc.prune_objects();
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| PdfError::Save(e.to_string()))?;

    Ok(RedactedPdf {
        bytes: out,
        pages,
        scrubbed_runs,
    })
}
