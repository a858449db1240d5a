//! Page extraction: an ordered chain of tiers from the local text layer to remote services.

mod chain;
mod direct;
pub mod error;
pub mod http;
pub mod raster;
pub mod service;
mod strategy;
pub mod tesseract;

pub use chain::{Attempt, ExtractionChain, ExtractionFailure};
pub use direct::{DirectParseStrategy, LayoutParseStrategy};
pub use error::{Result, ServiceError, ServiceErrorKind, StrategyError};
pub use http::{HttpExtractionService, RetryPolicy};
pub use raster::{PageRasterizer, PdfiumRasterizer};
pub use service::{ExtractionService, RemoteStrategy, ServiceField, ServiceResponse};
pub use strategy::{ExtractionMethod, ExtractionMode, ExtractionStrategy, PageExtraction};
pub use tesseract::{TesseractConfig, TesseractService};
