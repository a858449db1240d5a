//! Ordered fallback over extraction tiers.

use std::sync::Arc;

use docveil_types::{mask_snippet, FailureReason, PageDocument};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::direct::{DirectParseStrategy, LayoutParseStrategy};
use crate::service::{ExtractionService, RemoteStrategy};
use crate::strategy::{ExtractionMethod, ExtractionMode, ExtractionStrategy, PageExtraction};

/// One failed tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub method: ExtractionMethod,
    pub error: String,
}

/// Every applicable tier failed for a page.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("page {page_index}: extraction failed ({reason})")]
pub struct ExtractionFailure {
    pub page_index: usize,
    pub reason: FailureReason,
    pub attempts: Vec<Attempt>,
}

impl ExtractionFailure {
    fn from_attempts(page_index: usize, attempts: Vec<Attempt>) -> Self {
        let reason = attempts
            .iter()
            .find_map(|a| FailureReason::classify(&a.error))
            .unwrap_or(FailureReason::Unknown);
        Self {
            page_index,
            reason,
            attempts,
        }
    }
}

#[derive(Clone, Default)]
pub struct ExtractionChain {
    strategies: Vec<Arc<dyn ExtractionStrategy>>,
}

impl ExtractionChain {
    pub fn new(strategies: Vec<Arc<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Direct parse, remote OCR, layout parse, fallback remote. Absent services are left out.
    pub fn standard(
        remote: Option<Arc<dyn ExtractionService>>,
        fallback: Option<Arc<dyn ExtractionService>>,
    ) -> Self {
        let mut strategies: Vec<Arc<dyn ExtractionStrategy>> = vec![Arc::new(DirectParseStrategy)];
        if let Some(service) = remote {
            strategies.push(Arc::new(RemoteStrategy::primary(service)));
        }
        strategies.push(Arc::new(LayoutParseStrategy));
        if let Some(service) = fallback {
            strategies.push(Arc::new(RemoteStrategy::fallback(service)));
        }
        Self { strategies }
    }

    pub fn methods(&self) -> Vec<ExtractionMethod> {
        self.strategies.iter().map(|s| s.method()).collect()
    }

    /// Try each tier supporting `mode` in order; the first success wins.
    pub async fn extract(
        &self,
        page: &PageDocument,
        mode: ExtractionMode,
    ) -> Result<PageExtraction, ExtractionFailure> {
        let mut attempts = Vec::new();

        for strategy in &self.strategies {
            if !strategy.supports(mode) {
                log::debug!(
                    "[Extract] page {}: {} skipped for {:?}",
                    page.index,
                    strategy.method(),
                    mode
                );
                continue;
            }

            match strategy.extract(page, mode).await {
                Ok(extraction) => {
                    if log::log_enabled!(log::Level::Debug) {
                        log::debug!(
                            "[Extract] page {} text: {}",
                            page.index,
                            mask_snippet(&extraction.text)
                        );
                    }
                    return Ok(extraction);
                }
                Err(e) => {
                    log::warn!("[Extract] page {}: {} failed: {}", page.index, strategy.method(), e);
                    attempts.push(Attempt {
                        method: strategy.method(),
                        error: e.to_string(),
                    });
                }
            }
        }

        if attempts.is_empty() {
            attempts.push(Attempt {
                method: ExtractionMethod::DirectParse,
                error: format!("no extraction tier supports mode {:?}", mode),
            });
        }
        let failure = ExtractionFailure::from_attempts(page.index, attempts);
        log::error!("[Extract] {}", failure);
        Err(failure)
    }
}
