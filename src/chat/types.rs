//! Conversation, message and citation types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use super::title::title_from_question;

/// Opaque identifier of a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(Uuid);

impl ConversationId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque identifier of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Documentation excerpt backing an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub file: String,
    pub snippet: String,
}

/// A single chat message.
///
/// User messages are final when created. Assistant messages start empty with
/// `is_streaming` set and only ever grow until a terminal event clears the
/// flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    pub is_streaming: bool,
}

impl Message {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: text.into(),
            sources: None,
            is_streaming: false,
        }
    }

    /// Empty assistant message waiting for the first token
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: String::new(),
            sources: None,
            is_streaming: true,
        }
    }

    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// A chat thread.
///
/// Messages are held behind `Arc` so an update to the trailing message
/// copies only that message and leaves its siblings shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    pub messages: Vec<Arc<Message>>,
}

impl Conversation {
    /// Start a thread titled after its first question
    #[must_use]
    pub fn new(first_question: &str) -> Self {
        Self {
            id: ConversationId::new(),
            title: title_from_question(first_question),
            messages: Vec::new(),
        }
    }

    /// Append a user question and the assistant placeholder that will
    /// receive the streamed answer
    pub fn push_exchange(&mut self, question: &str) {
        self.messages.push(Arc::new(Message::user(question)));
        self.messages.push(Arc::new(Message::assistant_placeholder()));
    }

    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last().map(AsRef::as_ref)
    }
}
