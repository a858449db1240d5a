//! Opaque boxes on raster images.

use std::io::Cursor;

use docveil_types::{BoundingBox, MimeType};
use image::{DynamicImage, ImageFormat, Rgba};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::error::{RenderError, Result};

pub(crate) fn image_format(mime: &MimeType) -> Option<ImageFormat> {
    match mime {
        MimeType::Png => Some(ImageFormat::Png),
        MimeType::Jpeg => Some(ImageFormat::Jpeg),
        MimeType::Tiff => Some(ImageFormat::Tiff),
        _ => None,
    }
}

pub(crate) fn decode(bytes: &[u8], mime: &MimeType) -> Result<DynamicImage> {
    let format = image_format(mime).ok_or_else(|| RenderError::UnsupportedArtifact {
        mime: mime.to_string(),
        detail: "not a raster format".to_string(),
    })?;
    image::load_from_memory_with_format(bytes, format).map_err(|e| {
        RenderError::UnsupportedArtifact {
            mime: mime.to_string(),
            detail: e.to_string(),
        }
    })
}

/// Fill every box on `image`. Returns the number of rectangles drawn.
pub(crate) fn fill_boxes(image: &mut DynamicImage, boxes: &[BoundingBox], fill: [u8; 3]) -> usize {
    let (width, height) = (image.width(), image.height());
    let color = Rgba([fill[0], fill[1], fill[2], 255]);
    let mut drawn = 0;

    for bbox in boxes {
        let px = bbox.to_pixels(width, height);
        if px.width == 0 || px.height == 0 {
            continue;
        }
        let rect = Rect::at(px.x as i32, px.y as i32).of_size(px.width, px.height);
        draw_filled_rect_mut(image, rect, color);
        log::debug!(
            "[Render] box ({}, {}, {}, {})",
            px.x,
            px.y,
            px.width,
            px.height
        );
        drawn += 1;
    }

    drawn
}

/// Decode, burn `boxes` in, and re-encode in the source format.
pub(crate) fn redact_raster(
    bytes: &[u8],
    mime: &MimeType,
    boxes: &[BoundingBox],
    fill: [u8; 3],
) -> Result<Vec<u8>> {
    let mut image = decode(bytes, mime)?;
    let drawn = fill_boxes(&mut image, boxes, fill);

    let format = image_format(mime).ok_or_else(|| RenderError::UnsupportedArtifact {
        mime: mime.to_string(),
        detail: "not a raster format".to_string(),
    })?;
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, format)
        .map_err(|e| RenderError::Encode {
            mime: mime.to_string(),
            detail: e.to_string(),
        })?;

    log::info!(
        "[Render] {}x{} {}: {} box(es)",
        image.width(),
        image.height(),
        mime,
        drawn
    );
    Ok(out.into_inner())
}
