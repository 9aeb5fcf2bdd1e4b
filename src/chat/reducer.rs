//! Pure fold of stream events into the conversation collection
//!
//! Every function takes the current collection and returns the next one.
//! Only the path to the mutated message is copied: the target conversation
//! and its trailing assistant message. All other conversations and messages
//! keep their `Arc` and are shared with the previous collection.

use super::types::{Conversation, ConversationId, Message, Source};
use crate::stream::StreamEvent;
use std::sync::Arc;

/// Shown in place of an answer when the stream failed before any token
pub const FALLBACK_ERROR_MESSAGE: &str =
    "Sorry, an error occurred. Please make sure the backend is running and try again.";

/// Fold one stream event into the target conversation
#[must_use]
pub fn apply_event(
    conversations: &[Arc<Conversation>],
    conversation_id: ConversationId,
    event: &StreamEvent,
) -> Vec<Arc<Conversation>> {
    match event {
        StreamEvent::Token(text) => apply_token(conversations, conversation_id, text),
        StreamEvent::Sources(sources) => apply_sources(conversations, conversation_id, sources),
        StreamEvent::Done => apply_done(conversations, conversation_id),
        StreamEvent::Error(_) => {
            apply_error(conversations, conversation_id, FALLBACK_ERROR_MESSAGE)
        }
        StreamEvent::Unrecognized => conversations.to_vec(),
    }
}

/// Append streamed text to the trailing assistant message
#[must_use]
pub fn apply_token(
    conversations: &[Arc<Conversation>],
    conversation_id: ConversationId,
    text: &str,
) -> Vec<Arc<Conversation>> {
    update_last_assistant(conversations, conversation_id, |message| {
        if text.is_empty() {
            return None;
        }
        let mut next = message.clone();
        next.content.push_str(text);
        Some(next)
    })
}

/// Attach citations to the trailing assistant message
#[must_use]
pub fn apply_sources(
    conversations: &[Arc<Conversation>],
    conversation_id: ConversationId,
    sources: &[Source],
) -> Vec<Arc<Conversation>> {
    update_last_assistant(conversations, conversation_id, |message| {
        Some(Message {
            sources: Some(sources.to_vec()),
            ..message.clone()
        })
    })
}

/// Finish the trailing assistant message. Applying it again is a no-op.
#[must_use]
pub fn apply_done(
    conversations: &[Arc<Conversation>],
    conversation_id: ConversationId,
) -> Vec<Arc<Conversation>> {
    update_last_assistant(conversations, conversation_id, |message| {
        message.is_streaming.then(|| Message {
            is_streaming: false,
            ..message.clone()
        })
    })
}

/// Finish the trailing assistant message after a failure.
///
/// Partial output wins: `fallback` is only used when nothing was streamed.
#[must_use]
pub fn apply_error(
    conversations: &[Arc<Conversation>],
    conversation_id: ConversationId,
    fallback: &str,
) -> Vec<Arc<Conversation>> {
    update_last_assistant(conversations, conversation_id, |message| {
        let needs_fallback = message.content.is_empty() && !fallback.is_empty();
        if !message.is_streaming && !needs_fallback {
            return None;
        }
        let mut next = message.clone();
        next.is_streaming = false;
        if needs_fallback {
            next.content = fallback.to_string();
        }
        Some(next)
    })
}

/// Copy-on-write update of the last message of one conversation.
///
/// `update` sees the current message and returns its replacement, or `None`
/// to leave it untouched. Missing conversations and a trailing user message
/// are no-ops.
fn update_last_assistant<F>(
    conversations: &[Arc<Conversation>],
    conversation_id: ConversationId,
    update: F,
) -> Vec<Arc<Conversation>>
where
    F: FnOnce(&Message) -> Option<Message>,
{
    let mut next = conversations.to_vec();

    let Some(slot) = next.iter_mut().find(|c| c.id == conversation_id) else {
        return next;
    };
    let Some(updated) = slot
        .last_message()
        .filter(|m| m.is_assistant())
        .and_then(update)
    else {
        return next;
    };

    let conversation = Arc::make_mut(slot);
    if let Some(last) = conversation.messages.last_mut() {
        *last = Arc::new(updated);
    }
    next
}
