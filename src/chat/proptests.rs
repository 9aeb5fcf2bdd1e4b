//! Property-based tests for the message reducer
//!
//! These tests verify key invariants hold across arbitrary event sequences.

use super::reducer::*;
use super::types::*;
use crate::stream::StreamEvent;
use proptest::prelude::*;
use std::sync::Arc;

// ============================================================================
// Test Helpers
// ============================================================================

fn streaming_conversation() -> Vec<Arc<Conversation>> {
    let mut conv = Conversation::new("question");
    conv.push_exchange("question");
    vec![Arc::new(conv)]
}

fn answer(conversations: &[Arc<Conversation>]) -> Message {
    conversations[0].last_message().cloned().unwrap()
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_source() -> impl Strategy<Value = Source> {
    ("[a-z]{1,8}/[a-z]{1,8}\\.md", "[a-zA-Z ]{0,40}")
        .prop_map(|(file, snippet)| Source { file, snippet })
}

fn arb_event() -> impl Strategy<Value = StreamEvent> {
    prop_oneof![
        4 => "[a-zA-Z .,]{0,12}".prop_map(StreamEvent::Token),
        1 => proptest::collection::vec(arb_source(), 0..3).prop_map(StreamEvent::Sources),
        1 => Just(StreamEvent::Done),
        1 => "[a-z ]{0,20}".prop_map(StreamEvent::Error),
        1 => Just(StreamEvent::Unrecognized),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_tokens_concatenate_in_order(tokens in proptest::collection::vec("[a-zA-Z0-9 ]{0,10}", 0..30)) {
        let initial = streaming_conversation();
        let id = initial[0].id;

        let state = tokens
            .iter()
            .fold(initial, |state, token| apply_token(&state, id, token));

        prop_assert_eq!(answer(&state).content, tokens.concat());
        prop_assert!(answer(&state).is_streaming);
    }

    #[test]
    fn prop_done_is_idempotent(tokens in proptest::collection::vec("[a-z]{1,5}", 0..5)) {
        let initial = streaming_conversation();
        let id = initial[0].id;
        let state = tokens
            .iter()
            .fold(initial, |state, token| apply_token(&state, id, token));

        let once = apply_done(&state, id);
        let twice = apply_done(&once, id);

        prop_assert_eq!(answer(&once), answer(&twice));
        prop_assert!(!answer(&twice).is_streaming);
    }

    #[test]
    fn prop_error_never_overwrites_partial(partial in "[a-zA-Z]{1,30}", reason in "[a-z ]{0,20}") {
        let initial = streaming_conversation();
        let id = initial[0].id;
        let state = apply_token(&initial, id, &partial);
        let state = apply_event(&state, id, &StreamEvent::Error(reason));

        prop_assert_eq!(answer(&state).content, partial);
        prop_assert!(!answer(&state).is_streaming);
    }

    #[test]
    fn prop_error_on_empty_sets_exact_fallback(reason in "[a-z ]{0,20}") {
        let initial = streaming_conversation();
        let id = initial[0].id;
        let state = apply_event(&initial, id, &StreamEvent::Error(reason));

        prop_assert_eq!(answer(&state).content, FALLBACK_ERROR_MESSAGE);
    }

    #[test]
    fn prop_user_message_is_immutable(events in proptest::collection::vec(arb_event(), 0..20)) {
        let initial = streaming_conversation();
        let id = initial[0].id;
        let user_before = Arc::clone(&initial[0].messages[0]);

        let state = events
            .iter()
            .fold(initial, |state, event| apply_event(&state, id, event));

        prop_assert_eq!(state[0].messages.len(), 2);
        prop_assert!(Arc::ptr_eq(&state[0].messages[0], &user_before));
        prop_assert!(state[0].messages[0].sources.is_none());
    }

    #[test]
    fn prop_content_only_grows_while_streaming(events in proptest::collection::vec(arb_event(), 0..20)) {
        let mut state = streaming_conversation();
        let id = state[0].id;

        for event in &events {
            let before = answer(&state);
            state = apply_event(&state, id, event);
            let after = answer(&state);

            if before.is_streaming && after.is_streaming {
                prop_assert!(after.content.starts_with(&before.content));
            }
            if !before.content.is_empty() {
                prop_assert!(after.content.starts_with(&before.content));
            }
        }
    }
}
