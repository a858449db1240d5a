//! Reading documents, schemas, regions and configuration from disk.

use std::path::Path;

use anyhow::{bail, Context, Result};
use docveil_core::PipelineConfig;
use docveil_types::{ConfiguredDataElement, ManualRegion, MimeType, SourceDocument};

pub fn load_document(path: &Path) -> Result<SourceDocument> {
    let mime = path
        .extension()
        .and_then(|e| e.to_str())
        .map(MimeType::from_extension)
        .with_context(|| format!("{} has no file extension", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    let mut document = SourceDocument::new(bytes, mime);
    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
        document = document.with_name(name);
    }
    Ok(document)
}

pub fn load_schema(path: &Path) -> Result<Vec<ConfiguredDataElement>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    let elements: Vec<ConfiguredDataElement> = serde_json::from_str(&json)
        .with_context(|| format!("invalid schema {}", path.display()))?;

    let mut seen = std::collections::HashSet::new();
    for element in &elements {
        if !seen.insert(element.id.as_str()) {
            bail!("schema {} repeats element id '{}'", path.display(), element.id);
        }
    }
    Ok(elements)
}

pub fn load_regions(path: &Path) -> Result<Vec<ManualRegion>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read regions {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid regions {}", path.display()))
}

/// File (if any), then `DOCVEIL_*` environment.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let mut config = match path {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_env().context("invalid environment override")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docveil_types::ElementAction;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_schema_defaults() {
        let file = write_temp(
            ".json",
            br#"[
                {"id": "e-name", "name": "Surname", "action": "Redact", "aliases": ["Last Name"]},
                {"id": "e-dob", "name": "Date of Birth", "required": true}
            ]"#,
        );
        let elements = load_schema(file.path()).unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].action, ElementAction::Redact);
        assert_eq!(elements[0].aliases, vec!["Last Name"]);
        assert_eq!(elements[1].action, ElementAction::Extract);
        assert!(elements[1].required);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let file = write_temp(
            ".json",
            br#"[{"id": "e1", "name": "A"}, {"id": "e1", "name": "B"}]"#,
        );
        let err = load_schema(file.path()).unwrap_err();
        assert!(err.to_string().contains("repeats element id 'e1'"));
    }

    #[test]
    fn test_document_mime_from_extension() {
        let file = write_temp(".JPG", b"not really a jpeg");
        let document = load_document(file.path()).unwrap();
        assert_eq!(document.mime, MimeType::Jpeg);
        assert!(document.name.unwrap().ends_with(".JPG"));

        let err = load_document(Path::new("/nonexistent/scan.pdf")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/scan.pdf"));
    }

    #[test]
    fn test_regions() {
        let file = write_temp(
            ".json",
            br#"[{"id": "m1", "label": "Photo", "pageIndex": 0,
                  "boundingBox": {"left": 0.1, "top": 0.1, "width": 0.2, "height": 0.3}}]"#,
        );
        let regions = load_regions(file.path()).unwrap();
        assert_eq!(regions[0].label, "Photo");
        assert_eq!(regions[0].page_index, 0);
    }
}
