use std::path::PathBuf;

use crate::errors::Notice;
use crate::models::preview::{Preview, PreviewFormat};
use crate::models::template::TemplateDescriptor;
use crate::models::upload::Upload;
use crate::session::history::VersionHistory;
use crate::session::transcript::Transcript;

/// Which view the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Upload,
    Editor,
}

/// The request currently outstanding, if any.
///
/// `Generating`, `Modifying` and `Reverting` are mutating: while one of them
/// is set every other mutating request is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Idle,
    Generating,
    Modifying,
    /// Waiting for the preview of the version a revert restored.
    Reverting,
}

/// Everything one session holds. Mutated only through `reduce`.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub step: Step,
    pub activity: Activity,
    pub templates: Vec<TemplateDescriptor>,
    pub selected_template: Option<u32>,
    pub upload: Option<Upload>,
    /// `None` until a document has been generated.
    pub history: Option<VersionHistory>,
    pub transcript: Transcript,
    pub preview: Option<Preview>,
    pub preview_format: PreviewFormat,
    pub notice: Option<Notice>,
    pub last_export: Option<PathBuf>,
}

impl SessionState {
    pub fn new(preview_format: PreviewFormat) -> Self {
        Self {
            step: Step::Upload,
            activity: Activity::Idle,
            templates: Vec::new(),
            selected_template: None,
            upload: None,
            history: None,
            transcript: Transcript::default(),
            preview: None,
            preview_format,
            notice: None,
            last_export: None,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.activity != Activity::Idle
    }

    pub fn template(&self, id: u32) -> Option<&TemplateDescriptor> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn selected_template(&self) -> Option<&TemplateDescriptor> {
        self.selected_template.and_then(|id| self.template(id))
    }

    /// Markup of the current version.
    pub fn current_markup(&self) -> Option<&str> {
        self.history.as_ref().map(|h| h.current().content.as_str())
    }

    /// Returns the pending notice and clears it.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}
