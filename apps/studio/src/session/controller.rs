//! Client state controller: runs reducer effects against the backend.
//!
//! Foreground effects are awaited in place; their results are fed back into
//! `reduce` before `dispatch` returns. Detached preview compiles run on a
//! spawned task and report through the event channel, which the caller drains
//! with `next_event` from its event loop.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::errors::StudioError;
use crate::models::document::VersionId;
use crate::models::preview::{Artifact, Preview, PreviewFormat};
use crate::models::template::TemplateDescriptor;
use crate::session::reducer::{reduce, Action, Effect, ExportSource};
use crate::session::state::SessionState;

const PREVIEW_DIR: &str = "preview";

pub struct Controller {
    state: SessionState,
    backend: Arc<dyn Backend>,
    output_dir: PathBuf,
    events_tx: mpsc::UnboundedSender<Action>,
    events_rx: mpsc::UnboundedReceiver<Action>,
}

impl Controller {
    pub fn new(backend: Arc<dyn Backend>, preview_format: PreviewFormat, output_dir: PathBuf) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            state: SessionState::new(preview_format),
            backend,
            output_dir,
            events_tx,
            events_rx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// Applies `action` and every follow-up action its effects produce.
    ///
    /// Errors are returned only when `action` itself is rejected (validation
    /// or busy); in that case state is unchanged. Backend failures are not
    /// errors here: they become failure actions and surface as notices.
    pub async fn dispatch(&mut self, action: Action) -> Result<(), StudioError> {
        let effects = reduce(&mut self.state, action)?;
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            let Some(next) = self.run(effect).await else {
                continue;
            };
            match reduce(&mut self.state, next) {
                Ok(more) => queue.extend(more),
                Err(e) => {
                    warn!("Follow-up action rejected: {e}");
                    self.state.notice = Some(e.notice());
                }
            }
        }
        Ok(())
    }

    /// Waits for the next background event (a detached preview result).
    pub async fn next_event(&mut self) -> Option<Action> {
        self.events_rx.recv().await
    }

    /// Executes one effect. Foreground effects return their result action;
    /// detached ones return `None` and report through the event channel.
    async fn run(&self, effect: Effect) -> Option<Action> {
        match effect {
            Effect::FetchTemplates => Some(self.fetch_templates().await),

            Effect::Generate {
                upload,
                template_id,
            } => Some(match self.backend.generate(&upload, template_id).await {
                Ok(markup) => Action::GenerateSucceeded(markup),
                Err(e) => Action::GenerateFailed(e.notice()),
            }),

            Effect::Compile {
                version,
                markup,
                format,
                detached: false,
            } => Some(compile(self.backend.as_ref(), version, &markup, format).await),

            Effect::Compile {
                version,
                markup,
                format,
                detached: true,
            } => {
                let backend = Arc::clone(&self.backend);
                let events = self.events_tx.clone();
                tokio::spawn(async move {
                    let action = compile(backend.as_ref(), version, &markup, format).await;
                    if events.send(action).is_err() {
                        debug!("Session closed before preview of version {version} finished");
                    }
                });
                None
            }

            Effect::Modify {
                markup,
                prompt,
                history,
            } => Some(match self.backend.modify(&markup, &prompt, &history).await {
                Ok(modification) => Action::ModifySucceeded(modification),
                Err(e) => Action::ModifyFailed(e.notice()),
            }),

            Effect::Display(preview) => {
                let dir = self.output_dir.join(PREVIEW_DIR);
                match preview.write_to(&dir).await {
                    Ok(paths) => info!(
                        "Preview of version {} written: {}",
                        preview.version,
                        paths
                            .iter()
                            .map(|p| p.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                    Err(e) => warn!("Could not write preview: {e}"),
                }
                None
            }

            Effect::Export { file_name, source } => {
                Some(match self.export(&file_name, source).await {
                    Ok(path) => Action::ExportFinished(path),
                    Err(e) => Action::ExportFailed(e.notice()),
                })
            }
        }
    }

    /// Lists templates and fetches every raw source concurrently. A template
    /// whose source cannot be fetched is kept without a thumbnail.
    async fn fetch_templates(&self) -> Action {
        let summaries = match self.backend.list_templates().await {
            Ok(list) => list,
            Err(e) => return Action::TemplatesFailed(e.notice()),
        };

        let sources = join_all(
            summaries
                .iter()
                .map(|summary| self.backend.template_markup(&summary.filename)),
        )
        .await;

        let templates = summaries
            .into_iter()
            .zip(sources)
            .map(|(summary, source)| {
                let raw = match source {
                    Ok(raw) => Some(raw),
                    Err(e) => {
                        warn!("Error fetching content for {}: {e}", summary.filename);
                        None
                    }
                };
                TemplateDescriptor::from_summary(summary, raw)
            })
            .collect();
        Action::TemplatesLoaded(templates)
    }

    async fn export(&self, file_name: &str, source: ExportSource) -> Result<PathBuf, StudioError> {
        let bytes = match source {
            ExportSource::Rendered(bytes) => bytes,
            ExportSource::Markup(markup) => {
                match self.backend.compile(&markup, PreviewFormat::Pdf).await? {
                    Artifact::Pdf(bytes) => bytes,
                    Artifact::Svg { .. } => {
                        return Err(StudioError::Backend(
                            "Expected a PDF from the compiler".to_string(),
                        ))
                    }
                }
            }
        };

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(file_name);
        tokio::fs::write(&path, &bytes).await?;
        Ok(path)
    }
}

async fn compile(
    backend: &dyn Backend,
    version: VersionId,
    markup: &str,
    format: PreviewFormat,
) -> Action {
    match backend.compile(markup, format).await {
        Ok(artifact) => Action::PreviewReady(Preview { version, artifact }),
        Err(e) => Action::PreviewFailed {
            version,
            notice: e.notice(),
        },
    }
}
