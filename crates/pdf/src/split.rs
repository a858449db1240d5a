//! Splitting a source document into single-page documents.

use docveil_types::{MimeType, PageDocument, SourceDocument};
use lopdf::Document;

use crate::error::{PdfError, Result, SplitFailed};

/// Pages of a document, plus a warning when splitting had to fall back.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub pages: Vec<PageDocument>,
    pub warning: Option<SplitFailed>,
}

/// Number of pages in a PDF.
pub fn page_count(bytes: &[u8]) -> Result<usize> {
    let doc = Document::load_mem(bytes)?;
    Ok(doc.get_pages().len())
}

fn single_page_pdf(doc: &Document, keep: u32, total: u32) -> Result<Vec<u8>> {
    let mut single = doc.clone();
    let others: Vec<u32> = (1..=total).filter(|n| *n != keep).collect();
    single.delete_pages(&others);
    single.prune_objects();

    let mut buffer = Vec::new();
    single
        .save_to(&mut buffer)
        .map_err(|e| PdfError::Save(e.to_string()))?;
    Ok(buffer)
}

fn split_pdf(source: &SourceDocument) -> Result<Vec<PageDocument>> {
    let doc = Document::load_mem(&source.bytes)?;
    let total = doc.get_pages().len();
    if total == 0 {
        return Err(PdfError::Malformed("page tree is empty".to_string()));
    }
    source.page_count_or_init(|| total);

    (1..=total as u32)
        .map(|n| -> Result<PageDocument> {
            let bytes = single_page_pdf(&doc, n, total as u32)?;
            Ok(PageDocument::new(n as usize - 1, MimeType::Pdf, bytes))
        })
        .collect()
}

fn whole_document(source: &SourceDocument) -> Vec<PageDocument> {
    vec![PageDocument::new(0, source.mime.clone(), source.bytes.clone())]
}

/// Split `source` into independent pages, `pages[i].index == i`.
///
/// Raster images and unknown types are one page. When a PDF cannot be split the whole
/// document becomes page 0 and a [`SplitFailed`] warning is returned alongside.
pub fn split_pages(source: &SourceDocument) -> SplitOutcome {
    if !source.mime.is_pdf() {
        source.page_count_or_init(|| 1);
        return SplitOutcome {
            pages: whole_document(source),
            warning: None,
        };
    }

    match split_pdf(source) {
        Ok(pages) => {
            log::info!("[Split] {} page(s)", pages.len());
            SplitOutcome {
                pages,
                warning: None,
            }
        }
        Err(e) => {
            let warning = SplitFailed {
                reason: e.to_string(),
            };
            log::warn!("[Split] {}", warning);
            source.page_count_or_init(|| 1);
            SplitOutcome {
                pages: whole_document(source),
                warning: Some(warning),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::PdfFixture;
    use crate::text::extract_page_text;

    #[test]
    fn test_split_three_pages() {
        let bytes = PdfFixture::new()
            .page(&["Page one"])
            .page(&["Page two"])
            .page(&["Page three"])
            .build()
            .unwrap();
        let source = SourceDocument::new(bytes, MimeType::Pdf);

        let outcome = split_pages(&source);
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.pages.len(), 3);
        assert_eq!(source.page_count(), Some(3));

        for (i, page) in outcome.pages.iter().enumerate() {
            assert_eq!(page.index, i);
            assert_eq!(page_count(&page.bytes).unwrap(), 1);
        }
        let text = extract_page_text(&outcome.pages[1].bytes).unwrap();
        assert!(text.contains("Page two"));
        assert!(!text.contains("Page one"));
    }

    #[test]
    fn test_unreadable_pdf_degrades_to_one_page() {
        let source = SourceDocument::new(b"not a pdf at all".to_vec(), MimeType::Pdf);
        let outcome = split_pages(&source);

        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].index, 0);
        assert_eq!(outcome.pages[0].bytes, source.bytes);
        let warning = outcome.warning.unwrap();
        assert_eq!(warning.code(), "split_failed");
    }

    #[test]
    fn test_image_is_one_page() {
        let source = SourceDocument::new(vec![0x89, b'P', b'N', b'G'], MimeType::Png);
        let outcome = split_pages(&source);
        assert_eq!(outcome.pages.len(), 1);
        assert_eq!(outcome.pages[0].mime, MimeType::Png);
        assert!(outcome.warning.is_none());
        assert_eq!(source.page_count(), Some(1));
    }
}
