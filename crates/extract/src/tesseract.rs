//! Local Tesseract CLI as an extraction service.
//!
//! PDF pages are rasterized first. The page image is written to a temp file,
//! `tesseract <file> stdout ... tsv` is run under a deadline, and word boxes from the TSV are
//! normalized by the image size. Lines of the form `Label: Value` become fields whose box
//! covers the value words.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use docveil_types::{BoundingBox, MimeType};
use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::error::{ServiceError, ServiceErrorKind};
use crate::raster::{PageRasterizer, PdfiumRasterizer, DEFAULT_DPI};
use crate::service::{ExtractionService, ServiceField, ServiceResponse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TesseractConfig {
    pub binary_path: Option<String>,
    pub lang: String,
    pub psm: u32,
    pub oem: u32,
    pub tessdata_path: Option<String>,
    /// Seconds before a running `tesseract` is killed.
    pub timeout_secs: u64,
    /// Resolution PDF pages are rendered at before OCR.
    pub dpi: u32,
    /// Directory holding the pdfium library.
    pub pdfium_path: Option<String>,
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            binary_path: None,
            lang: "eng".to_string(),
            psm: 6,
            oem: 1,
            tessdata_path: None,
            timeout_secs: 120,
            dpi: DEFAULT_DPI,
            pdfium_path: None,
        }
    }
}

impl TesseractConfig {
    fn binary(&self) -> &str {
        self.binary_path.as_deref().unwrap_or("tesseract")
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// A recognized word, box already normalized.
#[derive(Debug, Clone, PartialEq)]
struct Word {
    text: String,
    confidence: f32,
    bbox: BoundingBox,
}

/// Parse Tesseract TSV:
/// `level page_num block_num par_num line_num word_num left top width height conf text`.
///
/// Keeps word rows (level 5) with text and a non-negative confidence, grouped by line in
/// reading order.
fn parse_tesseract_tsv(tsv: &str, img_width: f64, img_height: f64) -> Vec<Vec<Word>> {
    let mut lines: BTreeMap<(u32, u32, u32, u32), Vec<Word>> = BTreeMap::new();
    if img_width <= 0.0 || img_height <= 0.0 {
        return Vec::new();
    }

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let int = |i: usize| cols[i].trim().parse::<u32>().unwrap_or(0);
        let float = |i: usize, default: f64| cols[i].trim().parse::<f64>().unwrap_or(default);

        let level: i32 = cols[0].trim().parse().unwrap_or(-1);
        let conf = float(10, -1.0);
        let text = cols[11].trim();
        if level != 5 || text.is_empty() || conf < 0.0 {
            continue;
        }

        let bbox = BoundingBox::new(
            float(6, 0.0) / img_width,
            float(7, 0.0) / img_height,
            float(8, 0.0) / img_width,
            float(9, 0.0) / img_height,
        );
        lines
            .entry((int(1), int(2), int(3), int(4)))
            .or_default()
            .push(Word {
                text: text.to_string(),
                confidence: (conf / 100.0) as f32,
                bbox,
            });
    }

    lines.into_values().collect()
}

fn union(boxes: impl Iterator<Item = BoundingBox>) -> Option<BoundingBox> {
    boxes.reduce(|a, b| {
        let left = a.left().min(b.left());
        let top = a.top().min(b.top());
        BoundingBox::new(
            left,
            top,
            a.right().max(b.right()) - left,
            a.bottom().max(b.bottom()) - top,
        )
    })
}

/// Turn one recognized line into a field when it reads `Label: Value`.
fn line_field(words: &[Word]) -> Option<ServiceField> {
    let colon = words.iter().position(|w| w.text.contains(':'))?;
    let (label_tail, value_head) = words[colon].text.split_once(':')?;

    let mut label_parts: Vec<&str> = words[..colon].iter().map(|w| w.text.as_str()).collect();
    label_parts.push(label_tail);
    let label = label_parts.join(" ").trim().to_string();

    let mut value_words: Vec<&Word> = Vec::new();
    if !value_head.trim().is_empty() {
        value_words.push(&words[colon]);
    }
    value_words.extend(&words[colon + 1..]);

    let mut value_parts: Vec<&str> = vec![value_head.trim()];
    value_parts.extend(words[colon + 1..].iter().map(|w| w.text.as_str()));
    let value = value_parts.join(" ").trim().to_string();

    if label.is_empty() || value.is_empty() {
        return None;
    }

    let confidence = value_words
        .iter()
        .map(|w| w.confidence)
        .fold(1.0f32, f32::min);
    Some(ServiceField {
        label,
        value,
        confidence,
        bounding_box: union(value_words.iter().map(|w| w.bbox)),
    })
}

fn build_response(lines: &[Vec<Word>]) -> ServiceResponse {
    let text = lines
        .iter()
        .map(|words| {
            words
                .iter()
                .map(|w| w.text.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n");

    ServiceResponse {
        text,
        fields: lines.iter().filter_map(|words| line_field(words)).collect(),
        page_count: Some(1),
    }
}

fn extension(mime: &MimeType) -> &'static str {
    match mime {
        MimeType::Jpeg => "jpg",
        MimeType::Tiff => "tif",
        _ => "png",
    }
}

fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32), ServiceError> {
    image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ServiceError::unknown(format!("failed to read image: {e}")))?
        .into_dimensions()
        .map_err(|e| {
            ServiceError::new(
                ServiceErrorKind::UnsupportedFormat,
                format!("unsupported image: {e}"),
            )
        })
}

pub struct TesseractService {
    config: TesseractConfig,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl TesseractService {
    pub fn new(config: TesseractConfig) -> Self {
        let rasterizer = Arc::new(PdfiumRasterizer::new(config.pdfium_path.clone()));
        Self { config, rasterizer }
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Raster bytes and their type for a page, rendering PDF pages to PNG.
    async fn page_image(
        &self,
        bytes: &[u8],
        mime: &MimeType,
    ) -> Result<(Vec<u8>, MimeType), ServiceError> {
        if mime.is_raster() {
            return Ok((bytes.to_vec(), mime.clone()));
        }
        if !mime.is_pdf() {
            return Err(ServiceError::new(
                ServiceErrorKind::UnsupportedFormat,
                format!("tesseract cannot read {mime}"),
            ));
        }

        let rasterizer = Arc::clone(&self.rasterizer);
        let pdf = bytes.to_vec();
        let dpi = self.config.dpi;
        let png = tokio::task::spawn_blocking(move || rasterizer.rasterize(&pdf, dpi))
            .await
            .map_err(|e| ServiceError::unknown(format!("rasterize task failed: {e}")))??;
        Ok((png, MimeType::Png))
    }

    async fn run(&self, bytes: &[u8], mime: &MimeType) -> Result<String, ServiceError> {
        let config = &self.config;
        let start = Instant::now();
        let mut input = tempfile::Builder::new()
            .prefix("docveil-page-")
            .suffix(&format!(".{}", extension(mime)))
            .tempfile()
            .map_err(|e| ServiceError::unknown(format!("failed to create temp file: {e}")))?;
        input
            .write_all(bytes)
            .and_then(|_| input.flush())
            .map_err(|e| ServiceError::unknown(format!("failed to write temp file: {e}")))?;

        let mut cmd = Command::new(config.binary());
        cmd.arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&config.lang)
            .arg("--psm")
            .arg(config.psm.to_string())
            .arg("--oem")
            .arg(config.oem.to_string())
            .arg("tsv")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);
        if let Some(tessdata) = &config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata);
        }

        let child = cmd
            .spawn()
            .map_err(|e| ServiceError::unknown(format!("failed to run {}: {e}", config.binary())))?;
        // dropping the timed-out future drops the child, which kills it
        let finished = tokio::time::timeout(config.timeout(), child.wait_with_output()).await;
        let output = match finished {
            Ok(output) => {
                output.map_err(|e| ServiceError::unknown(format!("tesseract failed: {e}")))?
            }
            Err(_) => {
                log::warn!(
                    "[Tesseract] killed after {}s without finishing",
                    config.timeout().as_secs()
                );
                return Err(ServiceError::unknown(format!(
                    "tesseract timed out after {}s",
                    config.timeout().as_secs()
                )));
            }
        };
        if !output.status.success() {
            log::warn!(
                "[Tesseract] {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(ServiceError::unknown(format!(
                "tesseract exited with {}",
                output.status
            )));
        }

        log::debug!(
            "[Tesseract] {} -l {} --psm {} --oem {}: {} ms",
            config.binary(),
            config.lang,
            config.psm,
            config.oem,
            start.elapsed().as_millis()
        );
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl ExtractionService for TesseractService {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn analyze(&self, bytes: &[u8], mime: &MimeType) -> Result<ServiceResponse, ServiceError> {
        let (image, image_mime) = self.page_image(bytes, mime).await?;
        let (width, height) = image_dimensions(&image)?;

        let tsv = self.run(&image, &image_mime).await?;

        let lines = parse_tesseract_tsv(&tsv, width as f64, height as f64);
        let response = build_response(&lines);
        log::info!(
            "[Tesseract] {} line(s), {} field(s)",
            lines.len(),
            response.fields.len()
        );
        Ok(response)
    }
}
