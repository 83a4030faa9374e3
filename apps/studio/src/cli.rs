//! Interactive prompt: command parsing and transcript rendering.

use std::fmt::Write as _;
use std::path::PathBuf;

use crate::errors::{Notice, StudioError};
use crate::models::chat::ChatMessage;
use crate::models::template::TemplateDescriptor;
use crate::session::history::VersionHistory;
use crate::session::state::{Activity, SessionState, Step};

pub const HELP: &str = "\
Commands:
  /templates          list templates
  /template <id>      select a template
  /source <id>        print a template's raw source
  /file <path>        choose the resume to upload (PDF or DOCX)
  /remove             clear the chosen file
  /generate           generate the resume
  /refresh            recompile the preview
  /undo               go back one version
  /export             save the PDF to the output directory
  /history            list document versions
  /log                reprint the whole chat
  /status             show the session state
  /help               show this help
  /quit               exit
Anything else is sent to the AI as an edit instruction.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Templates,
    Template(u32),
    Source(u32),
    File(PathBuf),
    Remove,
    Generate,
    Refresh,
    Undo,
    Export,
    History,
    Log,
    Status,
    Quit,
    Prompt(String),
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, StudioError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(Some(Command::Prompt(line.to_string())));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "help" | "h" | "?" => Command::Help,
        "templates" => Command::Templates,
        "template" | "t" => Command::Template(parse_template_id(arg)?),
        "source" => Command::Source(parse_template_id(arg)?),
        "file" | "upload" => {
            if arg.is_empty() {
                return Err(StudioError::Validation("Usage: /file <path>".to_string()));
            }
            Command::File(PathBuf::from(arg))
        }
        "remove" => Command::Remove,
        "generate" | "gen" => Command::Generate,
        "refresh" => Command::Refresh,
        "undo" | "revert" => Command::Undo,
        "export" | "download" => Command::Export,
        "history" => Command::History,
        "log" => Command::Log,
        "status" => Command::Status,
        "quit" | "exit" | "q" => Command::Quit,
        other => {
            return Err(StudioError::Validation(format!(
                "Unknown command '/{other}'. Type /help for the list."
            )))
        }
    };
    Ok(Some(command))
}

fn parse_template_id(arg: &str) -> Result<u32, StudioError> {
    arg.parse::<u32>()
        .map_err(|_| StudioError::Validation(format!("'{arg}' is not a template id")))
}

pub fn render_template_source(template: &TemplateDescriptor) -> String {
    match &template.raw_preview {
        Some(raw) => format!("--- {} ---\n{raw}", template.name),
        None => format!("No source available for {}.", template.name),
    }
}

pub fn render_templates(templates: &[TemplateDescriptor], selected: Option<u32>) -> String {
    if templates.is_empty() {
        return "No templates available.".to_string();
    }
    let mut out = String::new();
    for t in templates {
        let marker = if Some(t.id) == selected { '*' } else { ' ' };
        let _ = write!(out, "{marker} [{}] {}", t.id, t.name);
        if !t.description.is_empty() {
            let _ = write!(out, " - {}", t.description);
        }
        out.push('\n');
    }
    out.pop();
    out
}

pub fn render_message(message: &ChatMessage) -> String {
    let time = message.created_at.format("%H:%M");
    match message.version {
        Some(v) => format!(
            "[{time}] {} (v{v}): {}",
            message.role.label(),
            message.content
        ),
        None => format!("[{time}] {}: {}", message.role.label(), message.content),
    }
}

pub fn render_history(history: &VersionHistory) -> String {
    history
        .iter()
        .map(|v| {
            let marker = if v.id == history.current_id() { '*' } else { ' ' };
            let first_line = v.content.lines().next().unwrap_or_default();
            format!(
                "{marker} v{} ({} bytes) {}",
                v.id,
                v.content.len(),
                first_line
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_notice(notice: &Notice) -> String {
    if notice.is_error() {
        format!("! {}", notice.message)
    } else {
        format!("> {}", notice.message)
    }
}

pub fn render_status(state: &SessionState) -> String {
    let step = match state.step {
        Step::Upload => "upload",
        Step::Editor => "editor",
    };
    let activity = match state.activity {
        Activity::Idle => "idle",
        Activity::Generating => "generating",
        Activity::Modifying => "modifying",
        Activity::Reverting => "reverting",
    };
    let template = state
        .selected_template()
        .map(|t| t.name.as_str())
        .unwrap_or("none");
    let file = state
        .upload
        .as_ref()
        .map(|u| u.file_name.as_str())
        .unwrap_or("none");
    let version = state
        .history
        .as_ref()
        .map(|h| format!("v{} of {}", h.current_id(), h.len()))
        .unwrap_or_else(|| "-".to_string());
    let preview = state
        .preview
        .as_ref()
        .map(|p| format!("v{}, {}", p.version, p.artifact.describe()))
        .unwrap_or_else(|| "none".to_string());
    let mut status = format!(
        "step: {step} ({activity}) | template: {template} | file: {file} | version: {version} | preview: {preview}"
    );
    if let Some(path) = &state.last_export {
        let _ = write!(status, " | exported: {}", path.display());
    }
    status
}

/// Prints transcript lines and notices that appeared since the last call.
#[derive(Debug, Default)]
pub struct Screen {
    printed: usize,
}

impl Screen {
    pub fn flush(&mut self, state: &mut SessionState) {
        let messages = state.transcript.messages();
        // Generation starts a fresh transcript.
        if self.printed > messages.len() {
            self.printed = 0;
        }
        for message in &messages[self.printed..] {
            println!("{}", render_message(message));
        }
        self.printed = messages.len();

        if let Some(notice) = state.take_notice() {
            println!("{}", render_notice(&notice));
        }
    }

    pub fn reprint(&mut self, state: &mut SessionState) {
        self.printed = 0;
        self.flush(state);
    }
}
