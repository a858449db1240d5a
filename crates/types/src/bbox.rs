//! Bounding boxes.
//!
//! Extraction services hand back boxes in more than one shape. They are folded into the
//! canonical [`BoundingBox`] exactly once, when they enter the system, and every later stage
//! works with that single shape.

use serde::{Deserialize, Serialize};

/// Raw box shapes accepted at ingestion. All values are fractions of the page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBoundingBox {
    /// `{Left, Top, Width, Height}` as produced by structured-extraction services.
    Pascal {
        #[serde(rename = "Left")]
        left: f64,
        #[serde(rename = "Top")]
        top: f64,
        #[serde(rename = "Width")]
        width: f64,
        #[serde(rename = "Height")]
        height: f64,
    },
    /// `{x, y, width, height}` as produced by viewers and OCR engines.
    Xywh {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    /// Already canonical `{left, top, width, height}`.
    Canonical {
        left: f64,
        top: f64,
        width: f64,
        height: f64,
    },
}

impl RawBoundingBox {
    fn components(&self) -> (f64, f64, f64, f64) {
        match *self {
            RawBoundingBox::Pascal {
                left,
                top,
                width,
                height,
            } => (left, top, width, height),
            RawBoundingBox::Xywh {
                x,
                y,
                width,
                height,
            } => (x, y, width, height),
            RawBoundingBox::Canonical {
                left,
                top,
                width,
                height,
            } => (left, top, width, height),
        }
    }
}

/// Canonical normalized rectangle. Every component is in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBoundingBox")]
pub struct BoundingBox {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

/// Rectangle in page pixels, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

impl BoundingBox {
    /// Build a box from fractional components, clamping it onto the page.
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        let left = unit(left);
        let top = unit(top);
        // keep the far edge on the page as well
        let width = unit(width).min(1.0 - left);
        let height = unit(height).min(1.0 - top);
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// The whole page.
    pub fn full_page() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.left < other.right()
            && other.left < self.right()
            && self.top < other.bottom()
            && other.top < self.bottom()
    }

    /// Scale onto a page canvas of `page_width` x `page_height` pixels.
    ///
    /// Edges are rounded outwards so a box never uncovers a partially covered pixel. Edges
    /// within float noise of a pixel boundary land on it.
    pub fn to_pixels(&self, page_width: u32, page_height: u32) -> PixelRect {
        let w = page_width as f64;
        let h = page_height as f64;

        let x0 = snap(self.left * w).floor().max(0.0) as u32;
        let y0 = snap(self.top * h).floor().max(0.0) as u32;
        let x1 = (snap(self.right() * w).ceil() as u32).min(page_width);
        let y1 = (snap(self.bottom() * h).ceil() as u32).min(page_height);

        PixelRect {
            x: x0.min(page_width),
            y: y0.min(page_height),
            width: x1.saturating_sub(x0),
            height: y1.saturating_sub(y0),
        }
    }
}

const PIXEL_EPSILON: f64 = 1e-6;

fn snap(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() < PIXEL_EPSILON {
        nearest
    } else {
        v
    }
}

impl From<RawBoundingBox> for BoundingBox {
    fn from(raw: RawBoundingBox) -> Self {
        let (left, top, width, height) = raw.components();
        BoundingBox::new(left, top, width, height)
    }
}
