use serde::{Deserialize, Serialize};

/// What the caller wants done with a matched element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementAction {
    Extract,
    Redact,
    ExtractAndRedact,
}

impl ElementAction {
    pub fn redacts(&self) -> bool {
        matches!(self, ElementAction::Redact | ElementAction::ExtractAndRedact)
    }
}

impl Default for ElementAction {
    fn default() -> Self {
        ElementAction::Extract
    }
}

/// One expected data element of a document type. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredDataElement {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub element_type: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub action: ElementAction,
    #[serde(default)]
    pub required: bool,
}

impl ConfiguredDataElement {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            element_type: "text".to_string(),
            category: String::new(),
            aliases: Vec::new(),
            action: ElementAction::Extract,
            required: false,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_action(mut self, action: ElementAction) -> Self {
        self.action = action;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}
