use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    Human,
    Assistant,
}

impl MessageRole {
    /// Heading used for the role in exported documents.
    pub fn heading(self) -> &'static str {
        match self {
            Self::Human => "You",
            Self::Assistant => "Gemini",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Human => write!(f, "human"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One turn of the conversation after normalization.
///
/// `content` is trimmed and never empty; a node that normalizes to nothing
/// never becomes a `Message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: None,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub total: usize,
    pub human: usize,
    pub assistant: usize,
}

impl RoleCounts {
    pub fn tally(messages: &[Message]) -> Self {
        let human = messages
            .iter()
            .filter(|message| message.role == MessageRole::Human)
            .count();
        Self {
            total: messages.len(),
            human,
            assistant: messages.len() - human,
        }
    }
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    pub title: String,
    pub message_count: usize,
    pub messages: Vec<Message>,
    #[serde(skip_serializing)]
    pub document: String,
}

/// Direction the loader walks a virtualized conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    /// Start at the most recent message and scroll toward the oldest.
    #[default]
    TowardOrigin,
    /// Start at the oldest message and scroll toward the most recent.
    TowardEnd,
}
