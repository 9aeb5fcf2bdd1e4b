//! Conversation collection and active-conversation pointer

use crate::chat::{apply_done, apply_event, Conversation, ConversationId};
use crate::stream::StreamEvent;
use serde::Serialize;
use std::sync::Arc;

/// State published to the presentation layer after every change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    /// Newest first
    pub conversations: Vec<Arc<Conversation>>,
    pub active_conversation_id: Option<ConversationId>,
    /// An answer stream is in flight; new questions are not accepted
    pub is_streaming: bool,
}

impl StoreSnapshot {
    #[must_use]
    pub fn conversation(&self, id: ConversationId) -> Option<&Arc<Conversation>> {
        self.conversations.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn active_conversation(&self) -> Option<&Arc<Conversation>> {
        self.active_conversation_id
            .and_then(|id| self.conversation(id))
    }

    /// No conversation selected: the front-end shows its welcome screen
    #[must_use]
    pub fn show_welcome(&self) -> bool {
        self.active_conversation_id.is_none()
    }
}

/// Data owned by the store. Only the store's command loop mutates it.
#[derive(Debug, Default)]
pub struct ConversationState {
    conversations: Vec<Arc<Conversation>>,
    active: Option<ConversationId>,
}

impl ConversationState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a question and an empty streaming answer.
    ///
    /// Without an active conversation a new one is created at the front of
    /// the list and activated; otherwise the pair is appended to the active
    /// conversation.
    pub fn start_conversation(&mut self, question: &str) -> ConversationId {
        if let Some(slot) = self
            .active
            .and_then(|id| self.conversations.iter_mut().find(|c| c.id == id))
        {
            Arc::make_mut(slot).push_exchange(question);
            return slot.id;
        }

        let mut conversation = Conversation::new(question);
        conversation.push_exchange(question);
        let id = conversation.id;
        self.conversations.insert(0, Arc::new(conversation));
        self.active = Some(id);
        id
    }

    /// Fold a stream event into a conversation
    pub fn apply(&mut self, conversation_id: ConversationId, event: &StreamEvent) {
        self.conversations = apply_event(&self.conversations, conversation_id, event);
    }

    /// Mark the trailing answer of a conversation as no longer streaming
    pub fn finish(&mut self, conversation_id: ConversationId) {
        self.conversations = apply_done(&self.conversations, conversation_id);
    }

    /// Activate an existing conversation. Unknown ids are ignored.
    pub fn select(&mut self, id: ConversationId) -> bool {
        if self.conversations.iter().any(|c| c.id == id) {
            self.active = Some(id);
            true
        } else {
            false
        }
    }

    pub fn new_chat(&mut self) {
        self.active = None;
    }

    #[must_use]
    pub fn snapshot(&self, is_streaming: bool) -> StoreSnapshot {
        StoreSnapshot {
            conversations: self.conversations.clone(),
            active_conversation_id: self.active,
            is_streaming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn test_first_question_creates_active_conversation() {
        let mut state = ConversationState::new();
        let id = state.start_conversation("How do I deploy?");

        let snapshot = state.snapshot(true);
        assert_eq!(snapshot.active_conversation_id, Some(id));
        let conv = snapshot.active_conversation().unwrap();
        assert_eq!(conv.title, "How do I deploy?");
        assert_eq!(conv.messages.len(), 2);
        assert_eq!(conv.messages[0].role, Role::User);
        assert!(conv.messages[1].is_streaming);
    }

    #[test]
    fn test_follow_up_appends_to_active_conversation() {
        let mut state = ConversationState::new();
        let first = state.start_conversation("first");
        state.finish(first);
        let second = state.start_conversation("second");

        assert_eq!(first, second);
        let snapshot = state.snapshot(false);
        assert_eq!(snapshot.conversations.len(), 1);
        assert_eq!(snapshot.conversations[0].messages.len(), 4);
        assert_eq!(snapshot.conversations[0].title, "first");
    }

    #[test]
    fn test_new_chat_prepends_next_conversation() {
        let mut state = ConversationState::new();
        let older = state.start_conversation("older");
        state.new_chat();
        assert!(state.snapshot(false).show_welcome());

        let newer = state.start_conversation("newer");
        let snapshot = state.snapshot(false);
        assert_eq!(snapshot.conversations[0].id, newer);
        assert_eq!(snapshot.conversations[1].id, older);
    }

    #[test]
    fn test_select_only_swaps_pointer() {
        let mut state = ConversationState::new();
        let a = state.start_conversation("a");
        state.new_chat();
        state.start_conversation("b");
        let before = state.snapshot(false);

        assert!(state.select(a));
        let after = state.snapshot(false);
        assert_eq!(after.active_conversation_id, Some(a));
        for (x, y) in before.conversations.iter().zip(&after.conversations) {
            assert!(Arc::ptr_eq(x, y));
        }

        assert!(!state.select(ConversationId::new()));
        assert_eq!(state.snapshot(false).active_conversation_id, Some(a));
    }

    #[test]
    fn test_published_snapshot_is_not_mutated_by_later_folds() {
        let mut state = ConversationState::new();
        let id = state.start_conversation("q");
        let published = state.snapshot(true);

        state.apply(id, &StreamEvent::Token("hello".to_string()));

        assert!(published.conversations[0].messages[1].content.is_empty());
        assert_eq!(state.snapshot(true).conversations[0].messages[1].content, "hello");
    }
}
