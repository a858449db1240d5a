//! Supplementary regex detection over page text.
//!
//! Detectors run in a fixed order and each carries a fixed confidence. Hits become
//! `source = pattern` fields whose boxes are synthesized, stacked in the top-right corner of the
//! page so that two hits of the same type never sit exactly on top of each other.

use std::collections::HashSet;

use docveil_types::{mask_snippet, BoundingBox, ExtractedField, FieldSource};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::matcher::normalize_name;

/// Kinds of values the detector recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternType {
    PassportNumber,
    MrzLine,
    DateOfBirth,
    DateOfExpiry,
    Email,
    PhoneNumber,
    PostalAddress,
    DocumentNumber,
    AccountNumber,
}

impl PatternType {
    /// Label given to detected fields. Matches the element names used in schemas.
    pub fn label(&self) -> &'static str {
        match self {
            PatternType::PassportNumber => "Passport Number",
            PatternType::MrzLine => "MRZ Line",
            PatternType::DateOfBirth => "Date of Birth",
            PatternType::DateOfExpiry => "Date of Expiry",
            PatternType::Email => "Email",
            PatternType::PhoneNumber => "Phone Number",
            PatternType::PostalAddress => "Postal Address",
            PatternType::DocumentNumber => "Document Number",
            PatternType::AccountNumber => "Account Number",
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            PatternType::PassportNumber => 0.90,
            PatternType::MrzLine => 0.95,
            PatternType::DateOfBirth | PatternType::DateOfExpiry => 0.85,
            PatternType::Email => 0.95,
            PatternType::PhoneNumber => 0.75,
            PatternType::PostalAddress => 0.70,
            PatternType::DocumentNumber | PatternType::AccountNumber => 0.80,
        }
    }
}

// Synthesized box layout.
const STACK_LEFT: f64 = 0.60;
const STACK_WIDTH: f64 = 0.35;
const STACK_HEIGHT: f64 = 0.03;
const STACK_TOP: f64 = 0.05;
const STACK_STEP: f64 = 0.04;

struct Detector {
    kind: PatternType,
    regex: Regex,
    accept: fn(&str) -> bool,
}

const DATE: &str = r"(\d{4}-\d{2}-\d{2}|\d{1,2}[./\- ](?:\d{1,2}|[A-Za-z]{3,9})[./\- ]\d{2,4})";

fn any(_: &str) -> bool {
    true
}

fn mrz_line(value: &str) -> bool {
    (30..=44).contains(&value.len()) && value.contains('<')
}

fn detector(kind: PatternType, pattern: &str, accept: fn(&str) -> bool) -> Detector {
    Detector {
        kind,
        // patterns are literals in this file
        regex: Regex::new(pattern).expect("invalid built-in pattern"),
        accept,
    }
}

static DETECTORS: Lazy<Vec<Detector>> = Lazy::new(|| {
    vec![
        detector(PatternType::PassportNumber, r"\b([A-Z][0-9]{7,8})\b", any),
        detector(PatternType::MrzLine, r"(?m)^\s*([A-Z0-9<]{30,44})\s*$", mrz_line),
        detector(
            PatternType::DateOfBirth,
            &format!(r"(?i)\b(?:date\s+of\s+birth|birth\s*date|d\.?o\.?b\.?)\s*[:\-]?\s*{DATE}"),
            any,
        ),
        detector(
            PatternType::DateOfExpiry,
            &format!(
                r"(?i)\b(?:date\s+of\s+expiry|expiry\s+date|expiration\s+date|expires|valid\s+until)\s*[:\-]?\s*{DATE}"
            ),
            any,
        ),
        detector(
            PatternType::Email,
            r"\b([A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,})\b",
            any,
        ),
        detector(
            PatternType::PhoneNumber,
            r"((?:\+\d{1,3}|\b\d{1,3})[\s.\-]?\(?\d{2,4}\)?[\s.\-]?\d{3,4}[\s.\-]?\d{3,4})\b",
            any,
        ),
        detector(
            PatternType::PostalAddress,
            r"(?i)\b(\d{1,5}\s+(?:[A-Za-z][A-Za-z.']*\s+){1,4}(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|way|court|ct)\b\.?)",
            any,
        ),
        detector(
            PatternType::DocumentNumber,
            r"(?i)\b(?:document|doc\.?)\s*(?:no\.?|number|#)\s*[:\-]?\s*([A-Z0-9][A-Z0-9\-]{4,19})\b",
            any,
        ),
        detector(
            PatternType::AccountNumber,
            r"(?i)\b(?:account|acct\.?)\s*(?:no\.?|number|#)\s*[:\-]?\s*(\d[\d\-]{5,19})\b",
            any,
        ),
    ]
});

fn stacked_box(slot: usize) -> BoundingBox {
    let top = (STACK_TOP + slot as f64 * STACK_STEP).min(1.0 - STACK_HEIGHT);
    BoundingBox::new(STACK_LEFT, top, STACK_WIDTH, STACK_HEIGHT)
}

/// Run every detector over `text`, in detector order.
///
/// The value is the first capture group when the pattern has one, the whole match otherwise.
/// Repeats of the same `(value, type)` are collapsed.
pub fn detect_patterns(text: &str, page_index: usize) -> Vec<ExtractedField> {
    let mut fields = Vec::new();
    let mut seen: HashSet<(String, PatternType)> = HashSet::new();

    for detector in DETECTORS.iter() {
        let mut slot = 0;
        for caps in detector.regex.captures_iter(text) {
            let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                continue;
            };
            let value = m.as_str().trim();
            if value.is_empty() || !(detector.accept)(value) {
                continue;
            }
            if !seen.insert((value.to_string(), detector.kind)) {
                continue;
            }

            log::debug!(
                "[Pattern] page {} {}: {}",
                page_index,
                detector.kind.label(),
                mask_snippet(value)
            );

            fields.push(
                ExtractedField::new(
                    format!("pattern-{}-{}", page_index, fields.len()),
                    detector.kind.label(),
                    value,
                    page_index,
                    FieldSource::Pattern,
                )
                .with_confidence(detector.kind.confidence())
                .with_box(stacked_box(slot)),
            );
            slot += 1;
        }
    }

    fields
}

/// Keep only pattern fields that add something over the backend fields.
///
/// A pattern field is dropped when any backend field carries the same value or is labeled with
/// the pattern's type. Backend fields are never touched.
pub fn merge_pattern_fields(
    backend: &[ExtractedField],
    pattern: Vec<ExtractedField>,
) -> Vec<ExtractedField> {
    let values: HashSet<String> = backend
        .iter()
        .map(|f| f.value.trim().to_lowercase())
        .collect();
    let labels: HashSet<String> = backend.iter().map(|f| normalize_name(&f.label)).collect();

    let before = pattern.len();
    let kept: Vec<ExtractedField> = pattern
        .into_iter()
        .filter(|p| {
            !values.contains(&p.value.trim().to_lowercase())
                && !labels.contains(&normalize_name(&p.label))
        })
        .collect();

    if kept.len() < before {
        log::debug!(
            "[Pattern] dropped {} pattern field(s) already covered by extraction",
            before - kept.len()
        );
    }
    kept
}
