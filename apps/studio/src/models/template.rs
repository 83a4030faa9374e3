use serde::{Deserialize, Serialize};

/// A template as listed by `GET /templates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSummary {
    pub id: u32,
    pub name: String,
    pub filename: String,
    #[serde(default)]
    pub description: String,
}

/// A selectable visual layout. Fetched once per session; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDescriptor {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Raw template source for thumbnails; `None` when it could not be fetched.
    pub raw_preview: Option<String>,
}

impl TemplateDescriptor {
    pub fn from_summary(summary: TemplateSummary, raw_preview: Option<String>) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            description: summary.description,
            raw_preview,
        }
    }
}
