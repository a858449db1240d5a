//! Text positioning state while walking a content stream.

use lopdf::content::Operation;
use lopdf::Object;

use crate::content::get_number;

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `m × n` in PDF row-vector convention.
fn multiply(m: &Matrix, n: &Matrix) -> Matrix {
    [
        m[0] * n[0] + m[1] * n[2],
        m[0] * n[1] + m[1] * n[3],
        m[2] * n[0] + m[3] * n[2],
        m[2] * n[1] + m[3] * n[3],
        m[4] * n[0] + m[5] * n[2] + n[4],
        m[4] * n[1] + m[5] * n[3] + n[5],
    ]
}

fn six_numbers(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut out = [0.0; 6];
    for (slot, obj) in out.iter_mut().zip(operands) {
        *slot = get_number(obj)?;
    }
    Some(out)
}

fn two_numbers(operands: &[Object]) -> Option<(f32, f32)> {
    match operands {
        [a, b, ..] => Some((get_number(a)?, get_number(b)?)),
        _ => None,
    }
}

/// Estimated advance of one byte of a simple font, in text space units per point of size.
pub(crate) fn glyph_advance(byte: u8) -> f32 {
    if byte < 128 {
        0.55
    } else {
        1.0
    }
}

/// Tracks graphics and text matrices across operators.
#[derive(Debug, Clone)]
pub(crate) struct TextCursor {
    ctm: Matrix,
    saved: Vec<Matrix>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    font_size: f32,
    leading: f32,
    in_text: bool,
}

impl TextCursor {
    pub(crate) fn new() -> Self {
        Self {
            ctm: IDENTITY,
            saved: Vec::new(),
            text_matrix: IDENTITY,
            line_matrix: IDENTITY,
            font_size: 12.0,
            leading: 0.0,
            in_text: false,
        }
    }

    pub(crate) fn in_text(&self) -> bool {
        self.in_text
    }

    pub(crate) fn font_size(&self) -> f32 {
        self.font_size
    }

    /// Apply a state-changing operator. Text-showing operators are left to the caller,
    /// which must call [`TextCursor::next_line`] and [`TextCursor::advance`] as they apply.
    pub(crate) fn apply(&mut self, op: &Operation) {
        match op.operator.as_str() {
            "q" => self.saved.push(self.ctm),
            "Q" => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = six_numbers(&op.operands) {
                    self.ctm = multiply(&m, &self.ctm);
                }
            }
            "BT" => {
                self.in_text = true;
                self.text_matrix = IDENTITY;
                self.line_matrix = IDENTITY;
            }
            "ET" => self.in_text = false,
            "Tm" => {
                if let Some(m) = six_numbers(&op.operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "Td" => {
                if let Some((tx, ty)) = two_numbers(&op.operands) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let Some((tx, ty)) = two_numbers(&op.operands) {
                    self.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "TL" => {
                if let Some(leading) = op.operands.first().and_then(get_number) {
                    self.leading = leading;
                }
            }
            "T*" => self.next_line(),
            "Tf" => {
                if let Some(size) = op.operands.get(1).and_then(get_number) {
                    self.font_size = size.abs();
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, ty], &self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `T*`, also implied by the `'` and `"` operators.
    pub(crate) fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    /// Move along the baseline by `tx` text space units.
    pub(crate) fn advance(&mut self, tx: f32) {
        self.text_matrix = multiply(&[1.0, 0.0, 0.0, 1.0, tx, 0.0], &self.text_matrix);
    }

    fn rendering_matrix(&self) -> Matrix {
        multiply(&self.text_matrix, &self.ctm)
    }

    /// Current glyph origin in user space.
    pub(crate) fn origin(&self) -> (f32, f32) {
        let m = self.rendering_matrix();
        (m[4], m[5])
    }

    /// User space units per text space unit along the baseline.
    pub(crate) fn scale(&self) -> f32 {
        let m = self.rendering_matrix();
        let s = (m[0] * m[0] + m[1] * m[1]).sqrt();
        if s > 0.0 {
            s
        } else {
            1.0
        }
    }
}
