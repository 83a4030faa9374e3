//! Scripted in-memory backend for session tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::backend::{Backend, Modification};
use crate::errors::StudioError;
use crate::models::chat::ChatTurn;
use crate::models::preview::{Artifact, PreviewFormat, SvgPage};
use crate::models::template::TemplateSummary;
use crate::models::upload::Upload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListTemplates,
    TemplateMarkup(String),
    Generate { file_name: String, template_id: u32 },
    Compile { markup: String, format: PreviewFormat },
    Modify { markup: String, prompt: String, history: Vec<ChatTurn> },
}

/// Responses are popped in order; an empty queue answers with a backend error.
/// `templates: None` makes listing fail. Compilation echoes the markup back as
/// the artifact body.
#[derive(Default)]
pub struct MockBackend {
    pub templates: Mutex<Option<Vec<TemplateSummary>>>,
    pub generate: Mutex<VecDeque<Result<String, String>>>,
    pub modify: Mutex<VecDeque<Result<Modification, String>>>,
    pub compile_error: Mutex<Option<String>>,
    pub calls: Mutex<Vec<Call>>,
}

impl MockBackend {
    pub fn with_templates(names: &[&str]) -> Self {
        let templates = names
            .iter()
            .enumerate()
            .map(|(i, name)| TemplateSummary {
                id: i as u32 + 1,
                name: name.to_string(),
                filename: format!("{}.typ", i + 1),
                description: String::new(),
            })
            .collect();
        Self {
            templates: Mutex::new(Some(templates)),
            ..Default::default()
        }
    }

    pub fn push_generate(&self, result: Result<&str, &str>) {
        self.generate
            .lock()
            .unwrap()
            .push_back(result.map(str::to_string).map_err(str::to_string));
    }

    pub fn push_modify(&self, result: Result<(&str, Option<&str>), &str>) {
        self.modify.lock().unwrap().push_back(
            result
                .map(|(markup, reply)| Modification {
                    markup: markup.to_string(),
                    reply: reply.map(str::to_string),
                })
                .map_err(str::to_string),
        );
    }

    pub fn fail_compile(&self, message: Option<&str>) {
        *self.compile_error.lock().unwrap() = message.map(str::to_string);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn network_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_templates(&self) -> Result<Vec<TemplateSummary>, StudioError> {
        self.record(Call::ListTemplates);
        self.templates
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| StudioError::Backend("Failed to load templates".to_string()))
    }

    async fn template_markup(&self, filename: &str) -> Result<String, StudioError> {
        self.record(Call::TemplateMarkup(filename.to_string()));
        if filename.starts_with('2') {
            return Err(StudioError::Backend("template source missing".to_string()));
        }
        Ok(format!("// source of {filename}"))
    }

    async fn generate(&self, upload: &Upload, template_id: u32) -> Result<String, StudioError> {
        self.record(Call::Generate {
            file_name: upload.file_name.clone(),
            template_id,
        });
        self.generate
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response".to_string()))
            .map_err(StudioError::Backend)
    }

    async fn compile(&self, markup: &str, format: PreviewFormat) -> Result<Artifact, StudioError> {
        self.record(Call::Compile {
            markup: markup.to_string(),
            format,
        });
        if let Some(message) = self.compile_error.lock().unwrap().clone() {
            return Err(StudioError::Backend(message));
        }
        let body = Bytes::from(markup.to_string());
        Ok(match format {
            PreviewFormat::Pdf => Artifact::Pdf(body),
            PreviewFormat::Svg => Artifact::Svg {
                basename: "resume-mock".to_string(),
                pages: vec![SvgPage {
                    filename: "resume-mock-1.svg".to_string(),
                    bytes: body,
                }],
            },
        })
    }

    async fn modify(
        &self,
        markup: &str,
        prompt: &str,
        history: &[ChatTurn],
    ) -> Result<Modification, StudioError> {
        self.record(Call::Modify {
            markup: markup.to_string(),
            prompt: prompt.to_string(),
            history: history.to_vec(),
        });
        self.modify
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response".to_string()))
            .map_err(StudioError::Backend)
    }
}
