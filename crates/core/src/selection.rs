use docveil_types::{MatchResult, RedactionSelection};

/// Selection implied by the configuration, followed by what the caller picked.
///
/// Matched fields whose element redacts are selected by field id. Placeholders of redacting
/// elements are selected by element id, so the gap shows up in the redaction report.
pub fn auto_select(matches: &[MatchResult], caller: &RedactionSelection) -> RedactionSelection {
    let mut selection = RedactionSelection::default();

    for result in matches {
        let Some(element) = result.element.as_ref().filter(|e| e.action.redacts()) else {
            continue;
        };
        match &result.field {
            Some(field) => selection.select(field.id.clone()),
            None => selection.select(element.id.clone()),
        };
    }

    for id in &caller.field_ids {
        selection.select(id.clone());
    }
    for region in &caller.manual_regions {
        selection.add_region(region.clone());
    }

    log::info!(
        "[Pipeline] selection: {} field(s), {} manual region(s)",
        selection.field_ids.len(),
        selection.manual_regions.len()
    );
    selection
}
