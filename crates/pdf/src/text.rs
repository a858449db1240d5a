//! Reading text out of a single-page PDF.

use docveil_types::{ExtractedField, FieldSource};
use lopdf::content::Content;
use lopdf::{Document, Object};

use crate::content::{get_page_content, page_id};
use crate::cursor::{glyph_advance, TextCursor};
use crate::error::{PdfError, Result};

const MAX_LABEL_CHARS: usize = 48;
/// Baselines closer than this are treated as the same line.
const SAME_LINE_TOLERANCE: f32 = 0.5;

fn load(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes)?;
    if doc.is_encrypted() {
        return Err(PdfError::Encrypted);
    }
    Ok(doc)
}

/// Text of every page through the font-aware text layer. Fails when there is none.
pub fn extract_page_text(bytes: &[u8]) -> Result<String> {
    let doc = load(bytes)?;
    let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let text = doc.extract_text(&numbers)?;

    if text.trim().is_empty() {
        return Err(PdfError::NoTextLayer);
    }
    Ok(text)
}

fn decode_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Visible text of one text-showing operator, and its advance in text space.
fn shown_text(operands: &[Object], font_size: f32) -> (String, f32) {
    let mut text = String::new();
    let mut advance = 0.0;

    for operand in operands {
        match operand {
            Object::String(bytes, _) => {
                text.push_str(&decode_bytes(bytes));
                advance += bytes.iter().map(|b| glyph_advance(*b)).sum::<f32>() * font_size;
            }
            Object::Array(items) => {
                for item in items {
                    match item {
                        Object::String(bytes, _) => {
                            text.push_str(&decode_bytes(bytes));
                            advance +=
                                bytes.iter().map(|b| glyph_advance(*b)).sum::<f32>() * font_size;
                        }
                        Object::Integer(_) | Object::Real(_) => {
                            let n = crate::content::get_number(item).unwrap_or(0.0);
                            // a large negative kern is a word gap
                            if n < -100.0 {
                                text.push(' ');
                            }
                            advance -= n / 1000.0 * font_size;
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    (text, advance)
}

/// Rebuild the lines of page `index` by walking its content stream.
///
/// Text items are appended in stream order; a line break is emitted whenever an item's
/// baseline differs from the previous item's.
pub fn layout_text(doc: &Document, index: usize) -> Result<String> {
    let content_data = get_page_content(doc, page_id(doc, index)?)?;
    let content = Content::decode(&content_data).map_err(|e| PdfError::Content(e.to_string()))?;

    let mut cursor = TextCursor::new();
    let mut out = String::new();
    let mut last_y: Option<f32> = None;

    for op in &content.operations {
        let operator = op.operator.as_str();
        let shown: &[Object] = match operator {
            "Tj" | "TJ" if cursor.in_text() => &op.operands,
            "'" if cursor.in_text() => {
                cursor.next_line();
                &op.operands
            }
            "\"" if cursor.in_text() => {
                cursor.next_line();
                op.operands.get(2..).unwrap_or(&[])
            }
            _ => {
                cursor.apply(op);
                continue;
            }
        };

        let (text, advance) = shown_text(shown, cursor.font_size());
        let (_, y) = cursor.origin();
        cursor.advance(advance);

        if text.trim().is_empty() {
            continue;
        }
        match last_y {
            Some(prev) if (prev - y).abs() > SAME_LINE_TOLERANCE => out.push('\n'),
            Some(_) if !out.ends_with(' ') && !text.starts_with(' ') => out.push(' '),
            _ => {}
        }
        out.push_str(&text);
        last_y = Some(y);
    }

    Ok(out)
}

/// [`layout_text`] of the first page of a single-page PDF. Fails when nothing is drawn as text.
pub fn layout_page_text(bytes: &[u8]) -> Result<String> {
    let doc = load(bytes)?;
    let text = layout_text(&doc, 0)?;
    if text.trim().is_empty() {
        return Err(PdfError::NoTextLayer);
    }
    Ok(text)
}

/// Turn `Label: Value` lines into geometry-less fields.
pub fn parse_key_values(text: &str, page_index: usize, source: FieldSource) -> Vec<ExtractedField> {
    let mut fields = Vec::new();

    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = label.trim();
        let value = value.trim();
        if label.is_empty() || value.is_empty() || label.chars().count() > MAX_LABEL_CHARS {
            continue;
        }
        // digits on the left usually mean a time or a ratio, not a label
        if label.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
            continue;
        }

        fields.push(ExtractedField::new(
            format!("kv-{}-{}", page_index, fields.len()),
            label,
            value,
            page_index,
            source,
        ));
    }

    fields
}
