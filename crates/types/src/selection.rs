use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// A region drawn by the user that is not tied to any extracted field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRegion {
    pub id: String,
    pub label: String,
    pub page_index: usize,
    pub bounding_box: BoundingBox,
}

/// What to obscure: field ids in selection order plus manual regions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionSelection {
    #[serde(default)]
    pub field_ids: Vec<String>,
    #[serde(default)]
    pub manual_regions: Vec<ManualRegion>,
}

impl RedactionSelection {
    /// Add a field id, keeping first-insertion order and ignoring repeats.
    pub fn select(&mut self, field_id: impl Into<String>) -> bool {
        let field_id = field_id.into();
        if self.field_ids.contains(&field_id) {
            return false;
        }
        self.field_ids.push(field_id);
        true
    }

    pub fn add_region(&mut self, region: ManualRegion) {
        self.manual_regions.push(region);
    }

    pub fn contains(&self, field_id: &str) -> bool {
        self.field_ids.iter().any(|id| id == field_id)
    }

    pub fn is_empty(&self) -> bool {
        self.field_ids.is_empty() && self.manual_regions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_keeps_order_without_repeats() {
        let mut selection = RedactionSelection::default();
        assert!(selection.select("b"));
        assert!(selection.select("a"));
        assert!(!selection.select("b"));
        assert_eq!(selection.field_ids, vec!["b".to_string(), "a".to_string()]);
        assert!(selection.contains("a"));
    }

    #[test]
    fn test_manual_region_deserializes_raw_box() {
        let json = r#"{
            "fieldIds": [],
            "manualRegions": [
                {"id":"m1","label":"Signature","pageIndex":1,
                 "boundingBox":{"Left":0.5,"Top":0.8,"Width":0.3,"Height":0.1}}
            ]
        }"#;
        let selection: RedactionSelection = serde_json::from_str(json).unwrap();
        let region = &selection.manual_regions[0];
        assert_eq!(region.page_index, 1);
        assert_eq!(region.bounding_box.left(), 0.5);
        assert!(!selection.is_empty());
    }
}
