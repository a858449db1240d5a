//! Deciding what gets drawn for a selection.

use std::collections::{BTreeMap, HashMap};

use docveil_types::{BoundingBox, ExtractedField, FieldSource, RedactionSelection};
use serde::{Deserialize, Serialize};

/// Why a redacted entry was not drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Selected id has no extracted field, e.g. a missing placeholder.
    Missing,
    NoGeometry,
    /// Pattern fields carry a placeholder box that says nothing about position.
    SynthesizedGeometry,
    PageOutOfRange,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Missing => "missing",
            SkipReason::NoGeometry => "no geometry",
            SkipReason::SynthesizedGeometry => "synthesized geometry",
            SkipReason::PageOutOfRange => "page out of range",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryOrigin {
    Field,
    Manual,
}

/// One redacted item as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionEntry {
    pub id: String,
    pub label: String,
    pub origin: EntryOrigin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    pub visually_redacted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<SkipReason>,
}

impl RedactionEntry {
    fn drawn(
        id: &str,
        label: &str,
        origin: EntryOrigin,
        page_index: usize,
        bbox: BoundingBox,
    ) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            origin,
            page_index: Some(page_index),
            bounding_box: Some(bbox),
            visually_redacted: true,
            skip_reason: None,
        }
    }

    fn skipped(mut self, reason: SkipReason) -> Self {
        self.visually_redacted = false;
        self.skip_reason = Some(reason);
        self
    }
}

fn field_entry(field: &ExtractedField, page_count: usize) -> RedactionEntry {
    let base = RedactionEntry {
        id: field.id.clone(),
        label: field.label.clone(),
        origin: EntryOrigin::Field,
        page_index: Some(field.page_index),
        bounding_box: field.bounding_box,
        visually_redacted: false,
        skip_reason: None,
    };

    match field.bounding_box {
        _ if field.source == FieldSource::Pattern => {
            base.skipped(SkipReason::SynthesizedGeometry)
        }
        Some(bbox) if !bbox.is_empty() => {
            if field.page_index >= page_count {
                base.skipped(SkipReason::PageOutOfRange)
            } else {
                RedactionEntry::drawn(
                    &field.id,
                    &field.label,
                    EntryOrigin::Field,
                    field.page_index,
                    bbox,
                )
            }
        }
        _ => base.skipped(SkipReason::NoGeometry),
    }
}

/// Entries for every selected field id (selection order), then every manual region.
pub fn plan_redactions(
    selection: &RedactionSelection,
    fields: &[ExtractedField],
    page_count: usize,
) -> Vec<RedactionEntry> {
    let by_id: HashMap<&str, &ExtractedField> =
        fields.iter().map(|f| (f.id.as_str(), f)).collect();
    let mut entries = Vec::with_capacity(selection.field_ids.len() + selection.manual_regions.len());

    for id in &selection.field_ids {
        let entry = match by_id.get(id.as_str()) {
            Some(field) => field_entry(field, page_count),
            None => RedactionEntry {
                id: id.clone(),
                label: id.clone(),
                origin: EntryOrigin::Field,
                page_index: None,
                bounding_box: None,
                visually_redacted: false,
                skip_reason: None,
            }
            .skipped(SkipReason::Missing),
        };
        entries.push(entry);
    }

    for region in &selection.manual_regions {
        let entry = RedactionEntry::drawn(
            &region.id,
            &region.label,
            EntryOrigin::Manual,
            region.page_index,
            region.bounding_box,
        );
        let entry = if region.bounding_box.is_empty() {
            entry.skipped(SkipReason::NoGeometry)
        } else if region.page_index >= page_count {
            entry.skipped(SkipReason::PageOutOfRange)
        } else {
            entry
        };
        entries.push(entry);
    }

    for entry in entries.iter().filter(|e| !e.visually_redacted) {
        log::info!(
            "[Render] {} '{}' not drawn: {}",
            entry.id,
            entry.label,
            entry.skip_reason.map(|r| r.as_str()).unwrap_or("")
        );
    }
    entries
}

/// Boxes to draw, keyed by page in page order.
pub fn regions_by_page(entries: &[RedactionEntry]) -> BTreeMap<usize, Vec<BoundingBox>> {
    let mut regions: BTreeMap<usize, Vec<BoundingBox>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.visually_redacted) {
        if let (Some(page), Some(bbox)) = (entry.page_index, entry.bounding_box) {
            regions.entry(page).or_default().push(bbox);
        }
    }
    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_types::ManualRegion;

    fn fields() -> Vec<ExtractedField> {
        vec![
            ExtractedField::new("ocr-0-0", "Passport No", "P1234567", 0, FieldSource::Ocr)
                .with_box(BoundingBox::new(0.1, 0.1, 0.3, 0.05)),
            ExtractedField::new("kv-0-0", "Surname", "Roe", 0, FieldSource::DirectParse),
            ExtractedField::new("pattern-1-0", "Email", "a@b.c", 1, FieldSource::Pattern)
                .with_box(BoundingBox::new(0.6, 0.05, 0.35, 0.03)),
            ExtractedField::new("ocr-5-0", "Phone", "555", 5, FieldSource::Ocr)
                .with_box(BoundingBox::new(0.1, 0.1, 0.1, 0.1)),
        ]
    }

    #[test]
    fn test_entries_follow_selection_order() {
        let mut selection = RedactionSelection::default();
        for id in ["kv-0-0", "ocr-0-0", "pattern-1-0", "gone", "ocr-5-0"] {
            selection.select(id);
        }
        selection.add_region(ManualRegion {
            id: "m1".into(),
            label: "Signature".into(),
            page_index: 1,
            bounding_box: BoundingBox::new(0.5, 0.8, 0.3, 0.1),
        });

        let entries = plan_redactions(&selection, &fields(), 2);
        let summary: Vec<(&str, bool, Option<SkipReason>)> = entries
            .iter()
            .map(|e| (e.id.as_str(), e.visually_redacted, e.skip_reason))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("kv-0-0", false, Some(SkipReason::NoGeometry)),
                ("ocr-0-0", true, None),
                ("pattern-1-0", false, Some(SkipReason::SynthesizedGeometry)),
                ("gone", false, Some(SkipReason::Missing)),
                ("ocr-5-0", false, Some(SkipReason::PageOutOfRange)),
                ("m1", true, None),
            ]
        );

        let regions = regions_by_page(&entries);
        assert_eq!(regions.keys().copied().collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(regions[&0].len(), 1);
    }

    #[test]
    fn test_entry_json_omits_absent_parts() {
        let mut selection = RedactionSelection::default();
        selection.select("gone");
        let entries = plan_redactions(&selection, &[], 1);
        let json = serde_json::to_value(&entries[0]).unwrap();
        assert_eq!(json["visuallyRedacted"], false);
        assert_eq!(json["skipReason"], "missing");
        assert!(json.get("boundingBox").is_none());
    }
}
