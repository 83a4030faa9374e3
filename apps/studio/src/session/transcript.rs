use chrono::Utc;

use crate::errors::StudioError;
use crate::models::chat::{ChatMessage, ChatTurn, Role};
use crate::models::document::VersionId;
use crate::session::history::VersionHistory;

/// Append-only chat log shown alongside the editor.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into(), None);
    }

    /// An AI line that does not point at any version.
    pub fn push_note(&mut self, content: impl Into<String>) {
        self.push(Role::Ai, content.into(), None);
    }

    /// An AI line tagged with a version. The version must exist in `history`.
    pub fn push_reply(
        &mut self,
        content: impl Into<String>,
        version: VersionId,
        history: &VersionHistory,
    ) -> Result<(), StudioError> {
        if !history.contains(version) {
            return Err(StudioError::NotFound(format!(
                "Version {version} is not in the history"
            )));
        }
        self.push(Role::Ai, content.into(), Some(version));
        Ok(())
    }

    /// The last `n` messages as backend context, oldest first.
    pub fn trailing_turns(&self, n: usize) -> Vec<ChatTurn> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..].iter().map(ChatTurn::from).collect()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    #[cfg(test)]
    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    fn push(&mut self, role: Role, content: String, version: Option<VersionId>) {
        self.messages.push(ChatMessage {
            role,
            content,
            version,
            created_at: Utc::now(),
        });
    }
}
