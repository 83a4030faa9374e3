use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::document::VersionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "you",
            Role::Ai => "ai",
        }
    }
}

/// One line of the chat transcript. Display only.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// The document version this message refers to, if any.
    pub version: Option<VersionId>,
    pub created_at: DateTime<Utc>,
}

/// A chat turn as sent to the backend for modification context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl From<&ChatMessage> for ChatTurn {
    fn from(message: &ChatMessage) -> Self {
        ChatTurn {
            role: message.role,
            content: message.content.clone(),
        }
    }
}
