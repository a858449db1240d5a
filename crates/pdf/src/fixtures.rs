//! In-memory PDFs for tests.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::error::{PdfError, Result};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;
pub const FONT_SIZE: i64 = 12;

/// A run of text drawn at `(x, y)` in user space.
pub type Run<'a> = (f32, f32, &'a str);

#[derive(Debug, Clone, Default)]
struct FixturePage {
    runs: Vec<(f32, f32, String)>,
    rotation: i64,
}

/// Builder for small Courier-only PDFs.
#[derive(Debug, Clone, Default)]
pub struct PdfFixture {
    pages: Vec<FixturePage>,
}

impl PdfFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// One page with `lines` stacked from the top-left margin, 20pt apart.
    pub fn page(self, lines: &[&str]) -> Self {
        self.rotated_page(lines, 0)
    }

    pub fn rotated_page(mut self, lines: &[&str], rotation: i64) -> Self {
        let runs = lines
            .iter()
            .enumerate()
            .map(|(i, line)| (72.0, 720.0 - 20.0 * i as f32, line.to_string()))
            .collect();
        self.pages.push(FixturePage { runs, rotation });
        self
    }

    pub fn page_with_runs(mut self, runs: &[Run<'_>]) -> Self {
        let runs = runs
            .iter()
            .map(|(x, y, text)| (*x, *y, text.to_string()))
            .collect();
        self.pages.push(FixturePage { runs, rotation: 0 });
        self
    }

    /// A page that draws a shape but no text.
    pub fn blank_page(mut self) -> Self {
        self.pages.push(FixturePage::default());
        self
    }

    pub fn build(&self) -> Result<Vec<u8>> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in &self.pages {
            // a stroked frame keeps blank pages from having an empty stream
            let mut operations = vec![
                Operation::new("q", vec![]),
                Operation::new("re", vec![10.into(), 10.into(), 20.into(), 20.into()]),
                Operation::new("S", vec![]),
                Operation::new("Q", vec![]),
            ];

            for (x, y, text) in &page.runs {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), FONT_SIZE.into()]));
                operations.push(Operation::new("Td", vec![Object::Real(*x), Object::Real(*y)]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(text.as_str())]));
                operations.push(Operation::new("ET", vec![]));
            }

            let content = Content { operations };
            let data = content
                .encode()
                .map_err(|e| PdfError::Content(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, data));

            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), Object::Real(PAGE_WIDTH), Object::Real(PAGE_HEIGHT)],
            };
            if page.rotation != 0 {
                page_dict.set("Rotate", page.rotation);
            }
            kids.push(doc.add_object(page_dict).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| PdfError::Save(e.to_string()))?;
        Ok(buffer)
    }
}
