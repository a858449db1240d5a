//! Page boxes and conversion from normalized display coordinates to PDF user space.

use docveil_types::BoundingBox;
use lopdf::{Document, Object, ObjectId};

/// Rectangle in unrotated PDF user space, origin bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl PdfRect {
    /// Whether a glyph box starting at `(x, y)` on the baseline touches this rectangle,
    /// allowing `margin` points of slack on every side.
    pub fn touches_glyph(&self, x: f32, y: f32, width: f32, height: f32, margin: f32) -> bool {
        let x_overlap = x < self.x + self.width + margin && x + width > self.x - margin;
        let y_overlap = y < self.y + self.height + margin && y + height > self.y - margin;
        x_overlap && y_overlap
    }
}

/// Visible box of a page plus its `/Rotate` value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
    /// One of 0, 90, 180, 270.
    pub rotation: i32,
}

const LETTER: (f32, f32, f32, f32) = (0.0, 0.0, 612.0, 792.0);

fn box_values(arr: &[Object]) -> Option<(f32, f32, f32, f32)> {
    let values: Vec<f32> = arr.iter().filter_map(crate::content::get_number).collect();
    if values.len() == 4 {
        Some((values[0], values[1], values[2], values[3]))
    } else {
        None
    }
}

/// Look `key` up on the page, then up the page tree.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok();
    // page trees are shallow; the bound guards against Parent cycles
    for _ in 0..32 {
        let dict = current?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict
            .get(b"Parent")
            .and_then(Object::as_reference)
            .and_then(|id| doc.get_dictionary(id))
            .ok();
    }
    None
}

impl PageGeometry {
    /// CropBox first, then MediaBox, both inheritable. Falls back to US Letter.
    pub fn of_page(doc: &Document, page_id: ObjectId) -> Self {
        let rotation = match inherited(doc, page_id, b"Rotate") {
            Some(Object::Integer(r)) => (*r as i32).rem_euclid(360),
            _ => 0,
        };

        let raw_box = [b"CropBox".as_slice(), b"MediaBox".as_slice()]
            .iter()
            .find_map(|key| match inherited(doc, page_id, key) {
                Some(Object::Array(arr)) => box_values(arr),
                _ => None,
            });

        let (llx, lly, urx, ury) = raw_box.unwrap_or_else(|| {
            log::warn!("[Geometry] page {:?} has no usable box, assuming Letter", page_id);
            LETTER
        });

        Self {
            llx: llx.min(urx),
            lly: lly.min(ury),
            urx: llx.max(urx),
            ury: lly.max(ury),
            rotation: (rotation / 90) * 90,
        }
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    /// Size of the page as a viewer shows it, after rotation.
    pub fn display_size(&self) -> (f32, f32) {
        if self.rotation == 90 || self.rotation == 270 {
            (self.height(), self.width())
        } else {
            (self.width(), self.height())
        }
    }

    /// Map a normalized box, measured on the displayed (rotated) page with a top-left origin,
    /// into unrotated user space.
    pub fn to_pdf_rect(&self, bbox: &BoundingBox) -> PdfRect {
        let (x, y) = (bbox.left() as f32, bbox.top() as f32);
        let (w, h) = (bbox.width() as f32, bbox.height() as f32);
        let page_w = self.width();
        let page_h = self.height();

        match self.rotation {
            // /Rotate turns the page clockwise for display
            90 => PdfRect {
                x: self.llx + y * page_w,
                y: self.lly + x * page_h,
                width: h * page_w,
                height: w * page_h,
            },
            180 => PdfRect {
                x: self.llx + (1.0 - x - w) * page_w,
                y: self.lly + y * page_h,
                width: w * page_w,
                height: h * page_h,
            },
            270 => PdfRect {
                x: self.llx + (1.0 - y - h) * page_w,
                y: self.lly + (1.0 - x - w) * page_h,
                width: h * page_w,
                height: w * page_h,
            },
            _ => PdfRect {
                x: self.llx + x * page_w,
                y: self.lly + (1.0 - y - h) * page_h,
                width: w * page_w,
                height: h * page_h,
            },
        }
    }
}
