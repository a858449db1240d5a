//! Rendering PDF pages to images for OCR.

use std::io::Cursor;

use image::ImageFormat;
use pdfium_render::prelude::*;

use crate::error::ServiceError;

pub const DEFAULT_DPI: u32 = 300;

/// Turns a single-page PDF into an encoded PNG.
pub trait PageRasterizer: Send + Sync {
    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<Vec<u8>, ServiceError>;
}

/// Rasterizer backed by the pdfium shared library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    /// Directory holding the pdfium library; the system library is tried after it.
    library_dir: Option<String>,
}

impl PdfiumRasterizer {
    pub fn new(library_dir: Option<String>) -> Self {
        Self { library_dir }
    }

    fn bind(&self) -> Result<Pdfium, ServiceError> {
        if let Some(dir) = &self.library_dir {
            let path = Pdfium::pdfium_platform_library_name_at_path(dir);
            match Pdfium::bind_to_library(&path) {
                Ok(bindings) => return Ok(Pdfium::new(bindings)),
                Err(e) => log::debug!("[Raster] no pdfium at {:?}: {}", path, e),
            }
        }
        Pdfium::bind_to_system_library()
            .map(Pdfium::new)
            .map_err(|e| ServiceError::unknown(format!("pdfium library unavailable: {e}")))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8], dpi: u32) -> Result<Vec<u8>, ServiceError> {
        let pdfium = self.bind()?;
        let document = pdfium
            .load_pdf_from_byte_slice(pdf, None)
            .map_err(|e| ServiceError::unknown(format!("malformed PDF page: {e}")))?;
        let page = document
            .pages()
            .get(0)
            .map_err(|e| ServiceError::unknown(format!("malformed PDF page: {e}")))?;

        let scale = dpi.max(1) as f32 / 72.0;
        let width = (page.width().value * scale) as i32;
        let height = (page.height().value * scale) as i32;
        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| ServiceError::unknown(format!("page render failed: {e}")))?;

        let mut png = Vec::new();
        bitmap
            .as_image()
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ServiceError::unknown(format!("PNG encode failed: {e}")))?;

        log::debug!("[Raster] page rendered at {} dpi: {}x{} px", dpi, width, height);
        Ok(png)
    }
}
