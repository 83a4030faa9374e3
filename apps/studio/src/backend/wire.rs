//! Request and response bodies of the Typst backend contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::chat::ChatTurn;
use crate::models::template::TemplateSummary;

#[derive(Debug, Deserialize)]
pub struct TemplateList {
    #[serde(default)]
    pub templates: Vec<TemplateSummary>,
}

/// `POST /process_typst`
#[derive(Debug, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    pub typst_resume: Option<String>,
    pub error: Option<String>,
}

/// `POST /compile-typst` with `format=svg`. The PDF variant returns raw bytes.
#[derive(Debug, Deserialize)]
pub struct CompileSvgResponse {
    pub basename: String,
}

/// `GET /list-svg-pages`
#[derive(Debug, Deserialize)]
pub struct SvgPageList {
    #[serde(default)]
    pub pages: Vec<String>,
}

/// `POST /modify-typst`
#[derive(Debug, Serialize)]
pub struct ModifyRequest<'a> {
    pub typst_code: &'a str,
    pub prompt: &'a str,
    pub history: &'a [ChatTurn],
}

#[derive(Debug, Deserialize)]
pub struct ModifyResponse {
    pub success: bool,
    pub modified_typst: Option<String>,
    pub reply_text: Option<String>,
    pub error: Option<String>,
}

/// Error body of a rejected request: `{"detail": ...}`.
/// `detail` is a string for explicit rejections and a list for validation errors.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Value,
}

impl ErrorBody {
    pub fn message(&self) -> String {
        match &self.detail {
            Value::String(s) => s.clone(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}
