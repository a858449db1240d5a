use lopdf::{Document, Object, ObjectId, Stream};

use crate::error::{PdfError, Result};

pub(crate) fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Object id of the 0-based page `index`.
pub(crate) fn page_id(doc: &Document, index: usize) -> Result<ObjectId> {
    doc.get_pages()
        .get(&(index as u32 + 1))
        .copied()
        .ok_or(PdfError::PageNotFound(index))
}

fn stream_content(stream: &Stream) -> Vec<u8> {
    stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone())
}

/// Concatenated content stream data of a page, compressed or not.
pub(crate) fn get_page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc.get_object(page_id)?;

    if let Object::Dictionary(dict) = page {
        if let Ok(contents) = dict.get(b"Contents") {
            match contents {
                Object::Reference(ref_id) => {
                    if let Ok(Object::Stream(stream)) = doc.get_object(*ref_id) {
                        return Ok(stream_content(stream));
                    }
                }
                Object::Array(arr) => {
                    let mut all_content = Vec::new();
                    for item in arr {
                        if let Object::Reference(ref_id) = item {
                            if let Ok(Object::Stream(stream)) = doc.get_object(*ref_id) {
                                all_content.extend(stream_content(stream));
                                all_content.push(b'\n');
                            }
                        }
                    }
                    return Ok(all_content);
                }
                Object::Stream(stream) => return Ok(stream_content(stream)),
                _ => {}
            }
        } else {
            // a page without Contents is blank
            return Ok(Vec::new());
        }
    }

    Err(PdfError::Content(format!(
        "page object {:?} has no readable content",
        page_id
    )))
}

/// Point the page at a fresh content stream.
pub(crate) fn replace_page_content(doc: &mut Document, page_id: ObjectId, data: Vec<u8>) -> Result<()> {
    let stream_id = doc.add_object(Stream::new(lopdf::Dictionary::new(), data));
    match doc.get_object_mut(page_id) {
        Ok(Object::Dictionary(dict)) => {
            dict.set("Contents", Object::Reference(stream_id));
            Ok(())
        }
        _ => Err(PdfError::Content(format!(
            "page object {:?} is not a dictionary",
            page_id
        ))),
    }
}
