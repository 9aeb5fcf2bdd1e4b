//! Conversation data model and the pure reducer that folds stream events
//! into it.

pub mod reducer;
mod title;
mod types;

#[cfg(test)]
mod proptests;

pub use reducer::{
    apply_done, apply_error, apply_event, apply_sources, apply_token, FALLBACK_ERROR_MESSAGE,
};
pub use title::{title_from_question, MAX_TITLE_CHARS};
pub use types::{Conversation, ConversationId, Message, MessageId, Role, Source};
