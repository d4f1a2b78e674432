//! Transcript messages.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the tool.
    User,
    /// The simulated assistant.
    Assistant,
}

impl Role {
    /// Lowercase name used in ids and CSS classes.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Author label shown above the message.
    #[must_use]
    pub fn author(self) -> &'static str {
        match self {
            Self::User => "You",
            Self::Assistant => "Assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable transcript entry. `content` is markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique id, also used as the DOM id.
    pub id: String,
    /// Author.
    pub role: Role,
    /// Markdown body.
    pub content: String,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a message stamped with the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: format!("{role}-{}", Uuid::new_v4().simple()),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Shorthand for an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
