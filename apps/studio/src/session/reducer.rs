//! The session transition function.
//!
//! `reduce` is the only place `SessionState` changes. It validates an action
//! against the current state, applies it, and returns the side effects the
//! controller must run. Network results come back in as further actions.

use std::path::PathBuf;

use anyhow::anyhow;
use bytes::Bytes;
use tracing::{debug, info, warn};

use crate::backend::Modification;
use crate::errors::{Notice, StudioError};
use crate::models::chat::ChatTurn;
use crate::models::document::VersionId;
use crate::models::preview::{export_file_name, Artifact, Preview, PreviewFormat};
use crate::models::template::TemplateDescriptor;
use crate::models::upload::Upload;
use crate::session::history::VersionHistory;
use crate::session::state::{Activity, SessionState, Step};
use crate::session::transcript::Transcript;

/// Number of trailing chat turns sent with a modification request.
pub const HISTORY_WINDOW: usize = 5;

const GREETING: &str = "I've generated your resume! The preview is the exact file you will export. \
    What would you like to change?";
const FIRST_VERSION_NOTE: &str = "Can't revert. This is the first version.";
const MISSING_VERSION_NOTE: &str = "Error: Previous version not found in history.";
const UNDO_LINE: &str = "Undo last change";
const MODIFY_APOLOGY: &str = "Sorry, I couldn't process that.";
const CHANGED_REPLY: &str = "Done. I've updated your resume.";
const UNCHANGED_REPLY: &str = "I didn't need to change anything for that.";

#[derive(Debug)]
pub enum Action {
    LoadTemplates,
    TemplatesLoaded(Vec<TemplateDescriptor>),
    TemplatesFailed(Notice),
    SelectTemplate(u32),
    SelectFile(Upload),
    RemoveFile,
    GenerateRequested,
    GenerateSucceeded(String),
    GenerateFailed(Notice),
    ModifyRequested(String),
    ModifySucceeded(Modification),
    ModifyFailed(Notice),
    RevertRequested,
    PreviewRequested,
    PreviewReady(Preview),
    PreviewFailed { version: VersionId, notice: Notice },
    ExportRequested,
    ExportFinished(PathBuf),
    ExportFailed(Notice),
}

/// What to export: bytes already on display, or markup that still needs a
/// PDF compile because the display holds SVG pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportSource {
    Rendered(Bytes),
    Markup(String),
}

#[derive(Debug)]
pub enum Effect {
    FetchTemplates,
    Generate {
        upload: Upload,
        template_id: u32,
    },
    /// `detached` compiles run in the background; their result arrives later
    /// as a `PreviewReady`/`PreviewFailed` event.
    Compile {
        version: VersionId,
        markup: String,
        format: PreviewFormat,
        detached: bool,
    },
    Modify {
        markup: String,
        prompt: String,
        history: Vec<ChatTurn>,
    },
    Display(Preview),
    Export {
        file_name: String,
        source: ExportSource,
    },
}

/// True for chat prompts that ask to undo the last change instead of
/// describing an edit.
pub fn is_revert_request(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    lower.contains("revert") || lower.contains("undo")
}

pub fn reduce(state: &mut SessionState, action: Action) -> Result<Vec<Effect>, StudioError> {
    match action {
        Action::LoadTemplates => Ok(vec![Effect::FetchTemplates]),

        Action::TemplatesLoaded(templates) => {
            info!("Loaded {} templates", templates.len());
            state.templates = templates;
            if let Some(id) = state.selected_template {
                if state.template(id).is_none() {
                    state.selected_template = None;
                }
            }
            Ok(vec![])
        }

        Action::TemplatesFailed(notice) => {
            warn!("Template list unavailable: {}", notice.message);
            state.templates.clear();
            state.selected_template = None;
            state.notice = Some(notice);
            Ok(vec![])
        }

        Action::SelectTemplate(id) => {
            require_upload_step(state)?;
            if state.template(id).is_none() {
                return Err(StudioError::Validation(format!("Unknown template {id}")));
            }
            state.selected_template = Some(id);
            Ok(vec![])
        }

        Action::SelectFile(upload) => {
            require_upload_step(state)?;
            if upload.is_empty() {
                return Err(StudioError::Validation(format!(
                    "'{}' is empty",
                    upload.file_name
                )));
            }
            debug!("Selected '{}' ({})", upload.file_name, upload.mime);
            state.upload = Some(upload);
            Ok(vec![])
        }

        Action::RemoveFile => {
            require_upload_step(state)?;
            state.upload = None;
            Ok(vec![])
        }

        Action::GenerateRequested => {
            require_upload_step(state)?;
            let upload = state
                .upload
                .clone()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| StudioError::Validation("Please upload a resume.".to_string()))?;
            let template_id = state
                .selected_template()
                .map(|t| t.id)
                .ok_or_else(|| StudioError::Validation("Please select a template.".to_string()))?;

            state.activity = Activity::Generating;
            Ok(vec![Effect::Generate {
                upload,
                template_id,
            }])
        }

        Action::GenerateSucceeded(markup) => {
            finish(state, Activity::Generating, "generation result")?;

            let history = VersionHistory::new(markup.clone());
            let mut transcript = Transcript::default();
            transcript.push_reply(GREETING, VersionId::FIRST, &history)?;

            state.history = Some(history);
            state.transcript = transcript;
            state.preview = None;
            state.step = Step::Editor;
            info!("Generated document version 1 ({} bytes)", markup.len());

            Ok(vec![Effect::Compile {
                version: VersionId::FIRST,
                markup,
                format: state.preview_format,
                detached: false,
            }])
        }

        Action::GenerateFailed(notice) => {
            finish(state, Activity::Generating, "generation failure")?;
            warn!("Generation failed: {}", notice.message);
            state.notice = Some(notice);
            Ok(vec![])
        }

        Action::ModifyRequested(prompt) => {
            let prompt = prompt.trim().to_string();
            if prompt.is_empty() {
                return Err(StudioError::Validation(
                    "Please enter an instruction.".to_string(),
                ));
            }
            if is_revert_request(&prompt) {
                return reduce(state, Action::RevertRequested);
            }
            require_idle(state)?;
            let markup = state
                .current_markup()
                .ok_or_else(no_document)?
                .to_string();

            state.transcript.push_user(prompt.clone());
            state.activity = Activity::Modifying;
            Ok(vec![Effect::Modify {
                markup,
                prompt,
                history: state.transcript.trailing_turns(HISTORY_WINDOW),
            }])
        }

        Action::ModifySucceeded(modification) => {
            finish(state, Activity::Modifying, "modification result")?;
            let history = state.history.as_mut().ok_or_else(no_document)?;

            let mut effects = Vec::new();
            let (version, fallback) = if modification.markup != history.current().content {
                let id = history.append(modification.markup.clone());
                info!("Modification produced version {id}");
                effects.push(Effect::Compile {
                    version: id,
                    markup: modification.markup,
                    format: state.preview_format,
                    detached: true,
                });
                (id, CHANGED_REPLY)
            } else {
                debug!("Modification left version {} unchanged", history.current_id());
                (history.current_id(), UNCHANGED_REPLY)
            };

            let reply = modification.reply.unwrap_or_else(|| fallback.to_string());
            state.transcript.push_reply(reply, version, history)?;
            Ok(effects)
        }

        Action::ModifyFailed(notice) => {
            finish(state, Activity::Modifying, "modification failure")?;
            warn!("Modification failed: {}", notice.message);
            state.transcript.push_note(MODIFY_APOLOGY);
            state.notice = Some(notice);
            Ok(vec![])
        }

        Action::RevertRequested => {
            require_idle(state)?;
            let history = state.history.as_mut().ok_or_else(no_document)?;

            let Some(target) = history.current_id().previous() else {
                state.transcript.push_note(FIRST_VERSION_NOTE);
                return Ok(vec![]);
            };

            let markup = match history.set_current(target) {
                Ok(version) => version.content.clone(),
                // Unreachable while ids stay contiguous from 1: `target` is
                // `current - 1 >= 1` and nothing is ever removed.
                Err(e) => {
                    state.transcript.push_note(MISSING_VERSION_NOTE);
                    state.notice = Some(e.notice());
                    return Ok(vec![]);
                }
            };

            info!("Reverted to version {target}");
            state.transcript.push_user(UNDO_LINE);
            state
                .transcript
                .push_reply(format!("Reverted to version {target}."), target, history)?;
            state.activity = Activity::Reverting;

            Ok(vec![Effect::Compile {
                version: target,
                markup,
                format: state.preview_format,
                detached: false,
            }])
        }

        Action::PreviewRequested => {
            require_idle(state)?;
            let history = state.history.as_ref().ok_or_else(no_document)?;
            Ok(vec![Effect::Compile {
                version: history.current_id(),
                markup: history.current().content.clone(),
                format: state.preview_format,
                detached: false,
            }])
        }

        Action::PreviewReady(preview) => {
            if !is_current(state, preview.version) {
                debug!("Dropping stale preview of version {}", preview.version);
                return Ok(vec![]);
            }
            end_revert(state);
            state.preview = Some(preview.clone());
            Ok(vec![Effect::Display(preview)])
        }

        Action::PreviewFailed { version, notice } => {
            if !is_current(state, version) {
                debug!("Ignoring failed preview of stale version {version}");
                return Ok(vec![]);
            }
            end_revert(state);
            warn!("Preview of version {version} failed: {}", notice.message);
            state.preview = None;
            state.notice = Some(notice);
            Ok(vec![])
        }

        Action::ExportRequested => {
            let history = state.history.as_ref().ok_or_else(no_document)?;
            let preview = state.preview.as_ref().ok_or_else(|| {
                StudioError::Validation(
                    "Nothing to export yet. Refresh the preview first.".to_string(),
                )
            })?;

            let source = match &preview.artifact {
                Artifact::Pdf(bytes) => ExportSource::Rendered(bytes.clone()),
                Artifact::Svg { .. } => {
                    let version = history.get(preview.version).ok_or_else(|| {
                        StudioError::NotFound(format!(
                            "Version {} is not in the history",
                            preview.version
                        ))
                    })?;
                    ExportSource::Markup(version.content.clone())
                }
            };
            let file_name = export_file_name(state.selected_template().map(|t| t.name.as_str()));

            Ok(vec![Effect::Export { file_name, source }])
        }

        Action::ExportFinished(path) => {
            info!("Exported {}", path.display());
            state.notice = Some(Notice::info(format!("Saved {}", path.display())));
            state.last_export = Some(path);
            Ok(vec![])
        }

        Action::ExportFailed(notice) => {
            warn!("Export failed: {}", notice.message);
            state.notice = Some(notice);
            Ok(vec![])
        }
    }
}

fn require_idle(state: &SessionState) -> Result<(), StudioError> {
    if state.is_busy() {
        return Err(StudioError::Busy);
    }
    Ok(())
}

fn require_upload_step(state: &SessionState) -> Result<(), StudioError> {
    require_idle(state)?;
    if state.step != Step::Upload {
        return Err(StudioError::Validation(
            "A resume has already been generated in this session.".to_string(),
        ));
    }
    Ok(())
}

/// Clears the in-flight marker for a completed request.
fn finish(state: &mut SessionState, expected: Activity, what: &str) -> Result<(), StudioError> {
    if state.activity != expected {
        return Err(StudioError::Internal(anyhow!(
            "{what} arrived while {:?}",
            state.activity
        )));
    }
    state.activity = Activity::Idle;
    Ok(())
}

fn end_revert(state: &mut SessionState) {
    if state.activity == Activity::Reverting {
        state.activity = Activity::Idle;
    }
}

fn is_current(state: &SessionState, version: VersionId) -> bool {
    state
        .history
        .as_ref()
        .is_some_and(|h| h.current_id() == version)
}

fn no_document() -> StudioError {
    StudioError::Validation("Generate a resume first.".to_string())
}
